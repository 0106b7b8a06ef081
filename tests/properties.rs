//! End-to-end behaviour of signals, class descriptors and result settlement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use signalvisor::{
    Aggregate, Args, BoxError, ClassDef, ExternalSignaller, Handler, HandlerDecl, InstanceId,
    NotifyOptions, Params, Reply, Signal, SignalError, SortMode, Validator,
};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn tagged(tag: &'static str) -> Handler {
    Handler::new(tag, move |_: &Args| Ok(Reply::ready(tag)))
}

fn values(tags: &[&str]) -> Vec<Value> {
    tags.iter().map(|t| json!(t)).collect()
}

struct Widget;

fn tag(name: &'static str) -> impl Fn(&Widget, &Args) -> Result<Reply, BoxError> + Send + Sync + 'static {
    move |_: &Widget, _: &Args| Ok(Reply::ready(name))
}

#[test]
fn test_connect_is_idempotent() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let h = Handler::new("count", move |_: &Args| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::Nothing)
    });

    let sig = Signal::new();
    sig.connect(h.clone()).unwrap();
    sig.connect(h.clone()).unwrap();
    assert_eq!(sig.len(), 1);

    sig.notify(&Args::new()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invocation_order_is_connection_order() {
    init_tracing();
    for concurrent in [false, true] {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sig = Signal::builder().with_concurrent(concurrent).build();
        for tag in ["h1", "h2", "h3"] {
            let seen = Arc::clone(&seen);
            sig.connect(Handler::new(tag, move |_: &Args| {
                seen.lock().push(tag);
                Ok(Reply::Nothing)
            }))
            .unwrap();
        }

        sig.notify(&Args::new()).unwrap();
        sig.notify(&Args::new()).unwrap();
        assert_eq!(*seen.lock(), vec!["h1", "h2", "h3", "h1", "h2", "h3"]);
    }
}

#[tokio::test]
async fn test_concurrent_results_follow_connection_order() {
    init_tracing();
    let (tx, rx) = oneshot::channel::<()>();
    let rx = Arc::new(Mutex::new(Some(rx)));
    let tx = Arc::new(Mutex::new(Some(tx)));

    let sig = Signal::builder().with_concurrent(true).build();
    sig.connect(Handler::new_async("h1", move |_: Args| {
        let rx = rx.lock().take();
        async move {
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            Ok(json!("h1"))
        }
    }))
    .unwrap();
    sig.connect(Handler::new_async("h2", move |_: Args| {
        let tx = tx.lock().take();
        async move {
            if let Some(tx) = tx {
                let _ = tx.send(());
            }
            Ok(json!("h2"))
        }
    }))
    .unwrap();

    let outcome = sig.notify(&Args::new()).unwrap();
    assert!(!outcome.is_done());
    assert_eq!(outcome.resolve().await.unwrap(), values(&["h1", "h2"]));
}

#[tokio::test]
async fn test_nested_results_are_flattened() {
    init_tracing();
    let inner = Signal::new();
    inner.connect(tagged("inner-ready")).unwrap();
    inner
        .connect(Handler::new_async("inner-pending", |_: Args| async {
            Ok(json!("inner-pending"))
        }))
        .unwrap();

    let outer = Signal::new();
    outer
        .connect(Handler::new("numbers", |_: &Args| {
            Ok(Reply::Many(Aggregate::from_values([json!(1), json!(2)])))
        }))
        .unwrap();
    outer
        .connect(Handler::new("forward", move |args: &Args| {
            let outcome = inner.notify(args)?;
            Ok(outcome.into_aggregate().map_or(Reply::Nothing, Reply::Many))
        }))
        .unwrap();
    outer
        .connect(Handler::new("three", |_: &Args| Ok(Reply::ready(3))))
        .unwrap();

    let results = outer.notify(&Args::new()).unwrap().resolve().await.unwrap();
    assert_eq!(
        results,
        vec![json!(1), json!(2), json!("inner-ready"), json!("inner-pending"), json!(3)]
    );
}

#[test]
fn test_no_result_sentinel_is_dropped() {
    init_tracing();
    let sig = Signal::new();
    sig.connect(Handler::new("nothing", |_: &Args| Ok(Reply::Nothing)))
        .unwrap();
    sig.connect(Handler::new("null", |_: &Args| Ok(Reply::Ready(Value::Null))))
        .unwrap();
    sig.connect(Handler::new("five", |_: &Args| Ok(Reply::ready(5))))
        .unwrap();

    let outcome = sig.notify(&Args::new()).unwrap();
    assert_eq!(outcome.results().unwrap(), &[Value::Null, json!(5)]);
}

#[test]
fn test_validation_gate() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let sig = Signal::builder()
        .with_validator(
            Validator::new(|args: &Args| Ok(args.kwarg("user").is_some_and(Value::is_string)))
                .with_params(Params::new().named("user").var_named()),
        )
        .build();
    sig.connect(Handler::new("count", move |_: &Args| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::Nothing)
    }))
    .unwrap();

    let err = sig.notify(&Args::new().with_named("user", 1)).unwrap_err();
    assert!(matches!(err, SignalError::ValidationFailed { source: None }));

    let err = sig.notify(&Args::new()).unwrap_err();
    assert!(matches!(err, SignalError::ValidationFailed { source: Some(_) }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    sig.notify(&Args::new().with_named("user", "ann")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_declared_parameters_filter_and_default() {
    init_tracing();
    let sig = Signal::new();
    sig.connect(
        Handler::new("echo", |args: &Args| {
            Ok(Reply::ready(json!({
                "positional": args.positional.clone(),
                "named": args.named.clone(),
            })))
        })
        .with_params(Params::new().arg("arg").named_or("kw", "default")),
    )
    .unwrap();

    let outcome = sig
        .notify(&Args::new().with_arg(1).with_named("other", true))
        .unwrap();
    assert_eq!(
        outcome.results().unwrap(),
        &[json!({ "positional": [1], "named": { "kw": "default" } })]
    );
}

#[test]
fn test_class_merge_order_per_sort_mode() {
    init_tracing();
    for (mode, expected) in [
        (SortMode::BottomUp, ["z", "a"]),
        (SortMode::TopDown, ["a", "z"]),
    ] {
        let base = ClassDef::<Widget>::builder("Base")
            .signal("click", Signal::builder().with_sort_mode(mode).build())
            .handler("click", "z", tag("z"))
            .build()
            .unwrap();
        let derived = ClassDef::builder("Derived")
            .extends(&base)
            .handler("click", "a", tag("a"))
            .build()
            .unwrap();

        let target = Arc::new(Widget);
        let inst = derived.attach(&target);
        let outcome = inst.signal("click").unwrap().notify(&Args::new()).unwrap();
        assert_eq!(outcome.results().unwrap(), values(&expected).as_slice());
    }
}

#[test]
fn test_pinning_across_three_levels() {
    init_tracing();
    let hierarchy = |mode: SortMode| {
        let base = ClassDef::<Widget>::builder("Base")
            .signal("click", Signal::builder().with_sort_mode(mode).build())
            .declare(HandlerDecl::new("click", "b_first", tag("b_first")).first())
            .handler("click", "b_norm", tag("b_norm"))
            .build()
            .unwrap();
        let mid = ClassDef::builder("Mid")
            .extends(&base)
            .handler("click", "m_norm", tag("m_norm"))
            .declare(HandlerDecl::new("click", "m_last", tag("m_last")).last())
            .build()
            .unwrap();
        ClassDef::builder("Leaf")
            .extends(&mid)
            .declare(HandlerDecl::new("click", "l_first", tag("l_first")).first())
            .handler("click", "l_norm", tag("l_norm"))
            .build()
            .unwrap()
    };

    let target = Arc::new(Widget);
    let bottom_up = hierarchy(SortMode::BottomUp).attach(&target);
    let outcome = bottom_up.signal("click").unwrap().notify(&Args::new()).unwrap();
    assert_eq!(
        outcome.results().unwrap(),
        values(&["b_first", "l_first", "b_norm", "m_norm", "l_norm", "m_last"]).as_slice()
    );

    let top_down = hierarchy(SortMode::TopDown).attach(&target);
    let outcome = top_down.signal("click").unwrap().notify(&Args::new()).unwrap();
    assert_eq!(
        outcome.results().unwrap(),
        values(&["l_first", "b_first", "l_norm", "m_norm", "b_norm", "m_last"]).as_slice()
    );
}

#[test]
fn test_declared_then_class_then_instance_handlers() {
    init_tracing();
    let class = ClassDef::<Widget>::builder("W")
        .signal("click", Signal::new())
        .handler("click", "declared", tag("declared"))
        .build()
        .unwrap();
    let target = Arc::new(Widget);
    let inst = class.attach(&target);
    let other = class.attach(&target);

    inst.signal("click").unwrap().connect(tagged("instance")).unwrap();
    class.signal("click").unwrap().connect(tagged("class")).unwrap();

    let outcome = inst.signal("click").unwrap().notify(&Args::new()).unwrap();
    assert_eq!(
        outcome.results().unwrap(),
        values(&["declared", "class", "instance"]).as_slice()
    );

    let outcome = other.signal("click").unwrap().notify(&Args::new()).unwrap();
    assert_eq!(outcome.results().unwrap(), values(&["declared", "class"]).as_slice());
}

#[test]
fn test_released_target_is_silently_absent() {
    init_tracing();
    struct Target;
    let target = Arc::new(Target);
    let sig = Signal::new();
    sig.connect(Handler::method(&target, "method", |_: &Target, _: &Args| {
        Ok(Reply::ready("method"))
    }))
    .unwrap();
    sig.connect(tagged("free")).unwrap();

    drop(target);
    let outcome = sig.notify(&Args::new()).unwrap();
    assert_eq!(outcome.results().unwrap(), values(&["free"]).as_slice());
    assert_eq!(sig.len(), 1);
}

#[tokio::test]
async fn test_sync_and_async_handlers_settle_alike() {
    init_tracing();
    fn incr(args: &Args) -> i64 {
        args.arg(0).and_then(Value::as_i64).unwrap_or(0) + 1
    }

    let sync = Signal::new();
    sync.connect(Handler::new("sync", |args: &Args| Ok(Reply::ready(incr(args)))))
        .unwrap();
    let deferred = Signal::new();
    deferred
        .connect(Handler::new_async("async", |args: Args| async move {
            Ok(json!(incr(&args)))
        }))
        .unwrap();

    let args = Args::new().with_arg(41);
    let a = sync.notify(&args).unwrap().resolve().await.unwrap();
    let b = deferred.notify(&args).unwrap().resolve().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a, vec![json!(42)]);
}

#[tokio::test]
async fn test_async_side_effect_lands_on_settlement() {
    init_tracing();
    let sync_hits = Arc::new(AtomicUsize::new(0));
    let async_hits = Arc::new(AtomicUsize::new(0));

    let sig = Signal::new();
    let s = Arc::clone(&sync_hits);
    sig.connect(
        Handler::new("sync", move |_: &Args| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::Nothing)
        })
        .with_params(Params::new().arg("n").named("kw")),
    )
    .unwrap();
    let a = Arc::clone(&async_hits);
    sig.connect(
        Handler::new_async("async", move |args: Args| {
            let a = Arc::clone(&a);
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(args.kwarg("kw").cloned().unwrap_or(Value::Null))
            }
        })
        .with_params(Params::new().arg("n").named("kw")),
    )
    .unwrap();

    let outcome = sig
        .notify(&Args::new().with_arg(1).with_named("kw", "a"))
        .unwrap();
    assert_eq!(sync_hits.load(Ordering::SeqCst), 1);
    assert_eq!(async_hits.load(Ordering::SeqCst), 0);
    assert!(!outcome.is_done());

    assert_eq!(outcome.resolve().await.unwrap(), vec![json!("a")]);
    assert_eq!(async_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_settlement_is_reported_once() {
    init_tracing();
    let sig = Signal::new();
    sig.connect(Handler::new_async("fails", |_: Args| async {
        Err::<Value, BoxError>("unreachable host".into())
    }))
    .unwrap();

    let mut agg = sig.notify(&Args::new()).unwrap().into_aggregate().unwrap();
    let err = agg.settle().await.unwrap_err();
    assert_eq!(err.as_message(), "execution failed: unreachable host");
    assert!(matches!(agg.settle().await, Err(SignalError::Poisoned)));
}

#[derive(Default)]
struct Outbox {
    published: Mutex<Vec<(Option<String>, Option<InstanceId>, Args, bool)>>,
}

impl ExternalSignaller for Outbox {
    fn publish(
        &self,
        signal: &Signal,
        instance: Option<InstanceId>,
        runtime: Option<&Handle>,
        args: &Args,
    ) -> Result<Reply, BoxError> {
        self.published.lock().push((
            signal.name().map(str::to_string),
            instance,
            args.clone(),
            runtime.is_some(),
        ));
        Ok(Reply::pending(async { Ok(json!("delivered")) }))
    }

    fn register(&self, _signal: &Signal, _name: &str) {}
}

#[tokio::test]
async fn test_external_publish_through_instance() {
    init_tracing();
    let outbox = Arc::new(Outbox::default());
    let class = ClassDef::<Widget>::builder("W")
        .external(outbox.clone())
        .signal("saved", Signal::new())
        .handler("saved", "local", tag("local"))
        .build()
        .unwrap();
    let target = Arc::new(Widget);
    let inst = class.attach(&target);
    let saved = inst.signal("saved").unwrap();

    let results = saved
        .notify(&Args::new().with_arg("doc"))
        .unwrap()
        .resolve()
        .await
        .unwrap();
    assert_eq!(results, values(&["local", "delivered"]));

    let results = saved
        .notify_with(&Args::new(), NotifyOptions::default().with_external(false))
        .unwrap()
        .resolve()
        .await
        .unwrap();
    assert_eq!(results, values(&["local"]));

    let published = outbox.published.lock();
    assert_eq!(published.len(), 1);
    let (name, instance, args, has_runtime) = &published[0];
    assert_eq!(name.as_deref(), Some("saved"));
    assert_eq!(*instance, Some(inst.id()));
    assert_eq!(args.arg(0), Some(&json!("doc")));
    assert!(*has_runtime);
}
