//! # signalvisor
//!
//! **Signalvisor** is an in-process signal library for Rust.
//!
//! Named signals carry ordered handlers, synchronous or asynchronous, attached
//! at runtime or declared on a class descriptor. Notifying a signal runs every
//! handler in a deterministic order, aggregates immediate and pending results
//! into one awaitable value, and optionally forwards the event to an external
//! delivery system.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ClassDef (registration table)        runtime connect()
//!   ├─ signals: click, saved, …          ├─ class level: Signal::connect
//!   └─ handlers, sorted once             └─ per instance: BoundSignal::connect
//!            │ attach(&Arc<T>)                         │
//!            ▼                                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Signal (shared state)                                            │
//! │  - Subscribers (class level, ordered, weak-safe)                  │
//! │  - side-table InstanceId → Subscribers                            │
//! │  - SignalConfig (concurrent, sort_mode, notify_external, …)       │
//! │  - hooks: on_notify / on_connect / on_disconnect / validator      │
//! │  - ExternalSignaller (optional)                                   │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                │ notify(args)
//!                                ▼
//!            merge: declared → class level → instance (dedup)
//!                                │ + external publish pseudo-handler
//!                                ▼
//!                   Executor (validate → wrapper? → exec_all)
//!                                │
//!                                ▼
//!                   Outcome::Results(Aggregate) ──► settle().await
//! ```
//!
//! ### Notification
//! ```text
//! notify(args)
//!   ├─► validator(args)     ── false / error ─► Err(ValidationFailed)
//!   ├─► for handler in merged list (strictly sequential):
//!   │       receiver released? ─► skip
//!   │       bind args to declared Params (arity error ─► Err(Execution))
//!   │       invoke ─► Ready | Pending | Many (flattened) | Nothing (dropped)
//!   └─► Aggregate
//!          ├─ nothing pending ─► done immediately
//!          └─ settle(): sequential or concurrent, results kept in handler order
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Signals**       | Connect, disconnect, notify; per-instance partitions.         | [`Signal`], [`BoundSignal`], [`InstanceId`] |
//! | **Handlers**      | Immediate or deferred callables, weakly bound receivers.      | [`Handler`], [`Reply`]                      |
//! | **Results**       | Mixed ready/pending results, one awaitable value.             | [`Aggregate`], [`Outcome`]                  |
//! | **Arguments**     | Structured call arguments, declared parameter lists.          | [`Args`], [`Params`]                        |
//! | **Hooks**         | Wrap notify/connect/disconnect, validate arguments.           | [`NotifyCall`], [`ConnectCall`], [`Validator`] |
//! | **Classes**       | Declared handlers over a hierarchy, pinning, sort modes.      | [`ClassDef`], [`HandlerDecl`], [`Instance`] |
//! | **External**      | Forward notifications to another event system.                | [`ExternalSignaller`]                       |
//! | **Errors**        | Typed errors for notifications and class builds.              | [`SignalError`], [`BindError`]              |
//! | **Configuration** | Per-signal options.                                           | [`SignalConfig`], [`SortMode`]              |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogSignaller`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::{json, Value};
//! use signalvisor::{Args, Handler, Reply, Signal};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let saved = Signal::builder()
//!         .with_name("saved")
//!         .with_concurrent(true)
//!         .build();
//!
//!     saved.connect(Handler::new("audit", |args: &Args| {
//!         Ok(Reply::ready(format!("audit {}", args.arg(0).unwrap_or(&Value::Null))))
//!     }))?;
//!     saved.connect(Handler::new_async("index", |args: Args| async move {
//!         Ok(json!({ "indexed": args.arg(0).cloned() }))
//!     }))?;
//!
//!     let outcome = saved.notify(&Args::new().with_arg(42))?;
//!     let results = outcome.resolve().await?;
//!     assert_eq!(results, vec![json!("audit 42"), json!({ "indexed": 42 })]);
//!     Ok(())
//! }
//! ```
mod class;
mod core;
mod error;
mod events;
mod handlers;
mod signal;

// ---- Public re-exports ----

pub use class::{ClassBuilder, ClassDef, ClassInfo, Directive, HandlerDecl, Instance};
pub use core::{
    Aggregate, ExecContext, Executor, NotifyCall, NotifyHook, Outcome, Param, ParamKind, Params,
    Proceed, SignalConfig, SortMode, Validator,
};
pub use error::{BindError, BoxError, SignalError};
pub use events::Args;
pub use handlers::{Deferred, Handler, HandlerKey, Reply, Subscribers};
pub use signal::{
    BoundSignal, ConnectCall, ConnectHook, ExternalSignaller, InstanceId, NotifyOptions, Signal,
    SignalBuilder,
};

// Optional: expose a simple built-in logging external signaller (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use signal::LogSignaller;
