//! # Example: class_hierarchy
//!
//! Declares handlers over a two-level class hierarchy and forwards every
//! notification to the built-in [`LogSignaller`].
//!
//! Shows how to:
//! - Declare signals and handlers with [`ClassDef::builder`].
//! - Pin handlers with [`HandlerDecl::first`] / [`HandlerDecl::last`].
//! - Attach an instance, connect a per-instance handler and settle results.
//!
//! ## Flow
//! ```text
//! ClassDef "Document" ── extends ──► ClassDef "Report"
//!     │ attach(&Arc<Doc>)
//!     ▼
//! Instance.signal("saved").notify(args)
//!     ├─► declared handlers (pinned first, normal, pinned last)
//!     ├─► per-instance handlers
//!     └─► LogSignaller.publish ──► tracing "signal published"
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogSignaller`].
//! ```bash
//! RUST_LOG=info cargo run --example class_hierarchy --features logging
//! ```

use std::sync::Arc;

use serde_json::{json, Value};
use signalvisor::{Args, ClassDef, Handler, HandlerDecl, LogSignaller, Params, Reply, Signal};

/// Target object the declared handlers are bound to.
struct Doc {
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let document = ClassDef::<Doc>::builder("Document")
        .external(Arc::new(LogSignaller::new()))
        .signal("saved", Signal::builder().with_concurrent(true).build())
        .declare(
            HandlerDecl::new("saved", "lock", |doc: &Doc, _: &Args| {
                Ok(Reply::ready(format!("locked {}", doc.title)))
            })
            .first(),
        )
        .handler("saved", "audit", |doc: &Doc, args: &Args| {
            Ok(Reply::ready(json!({ "audit": doc.title, "rev": args.arg(0) })))
        })
        .build()?;

    let report = ClassDef::builder("Report")
        .extends(&document)
        .declare(
            HandlerDecl::new_async("saved", "render", |doc: Arc<Doc>, args: Args| async move {
                let format = args.kwarg("format").cloned().unwrap_or(Value::Null);
                Ok(json!({ "rendered": doc.title, "format": format }))
            })
            .with_params(Params::new().arg("rev").named_or("format", "pdf")),
        )
        .declare(
            HandlerDecl::new("saved", "unlock", |doc: &Doc, _: &Args| {
                Ok(Reply::ready(format!("unlocked {}", doc.title)))
            })
            .last(),
        )
        .build()?;

    for (signal, handlers) in report.info().signals().iter().map(|s| (s, report.handlers_for(s))) {
        println!("[class] {} {signal}: {handlers:?}", report.name());
    }

    let target = Arc::new(Doc {
        title: "q3-summary".into(),
    });
    let instance = report.attach(&target);
    let saved = instance.signal("saved")?;
    saved.connect(Handler::new("notify_owner", |args: &Args| {
        Ok(Reply::ready(format!("owner told about rev {}", args.arg(0).unwrap_or(&Value::Null))))
    }))?;

    let outcome = saved.notify(&Args::new().with_arg(7))?;
    println!("[notify] done immediately: {}", outcome.is_done());
    for value in outcome.resolve().await? {
        println!("[result] {value}");
    }

    // Declared handlers hold the target weakly; only the connected one remains.
    drop(target);
    let outcome = instance.signal("saved")?.notify(&Args::new().with_arg(8))?;
    println!("[notify] after release: {:?}", outcome.resolve().await?);
    Ok(())
}
