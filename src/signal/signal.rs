//! # Signal: a named notification point.
//!
//! A [`Signal`] owns:
//! - the class-level runtime subscribers,
//! - a side-table of per-instance subscribers keyed by [`InstanceId`],
//! - its options ([`SignalConfig`]) and optional hooks,
//! - an optional [`ExternalSignaller`].
//!
//! `Signal` is a cheap handle (`Clone` shares the same state). Used directly
//! it acts at class level; [`Signal::bind`] scopes it to one instance.
//!
//! ## Architecture
//! ```text
//!                 Signal (Arc<Inner>)
//!   ┌──────────────────────────────────────────────┐
//!   │ name: OnceLock        config: SignalConfig   │
//!   │ subscribers: RwLock<Subscribers>             │
//!   │ instances: RwLock<HashMap<InstanceId, Subs>> │
//!   │ hooks: notify / connect / disconnect / valid │
//!   │ external: RwLock<Option<Arc<dyn External>>>  │
//!   └──────────────────────────────────────────────┘
//!        │ bind(id)                  │ notify(args)
//!        ▼                           ▼
//!   BoundSignal ── merge ──► Executor ──► Outcome
//! ```
//!
//! ## Example
//! ```rust
//! use signalvisor::{Args, Handler, Reply, Signal};
//! use serde_json::json;
//!
//! let clicked = Signal::named("clicked");
//! clicked
//!     .connect(Handler::new("double", |args: &Args| {
//!         let n = args.arg(0).and_then(|v| v.as_i64()).unwrap_or(0);
//!         Ok(Reply::ready(n * 2))
//!     }))
//!     .unwrap();
//!
//! let outcome = clicked.notify(&Args::new().with_arg(21)).unwrap();
//! assert_eq!(outcome.results().unwrap(), &[json!(42)]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tokio::runtime::Handle;

use super::{
    bound::{BoundSignal, InstanceId, NotifyOptions},
    hooks::{ConnectCall, ConnectHook},
    ExternalSignaller,
};
use crate::{
    core::{NotifyCall, NotifyHook, Outcome, SignalConfig, SortMode, Validator},
    error::{BoxError, SignalError},
    events::Args,
    handlers::{Handler, Reply, Subscribers},
};

/// Optional hooks of a signal.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) notify: Option<NotifyHook>,
    pub(crate) connect: Option<ConnectHook>,
    pub(crate) disconnect: Option<ConnectHook>,
    pub(crate) validator: Option<Validator>,
}

pub(crate) struct Inner {
    pub(crate) name: OnceLock<Arc<str>>,
    pub(crate) config: SignalConfig,
    pub(crate) hooks: Hooks,
    pub(crate) runtime: Option<Handle>,
    pub(crate) subscribers: RwLock<Subscribers>,
    pub(crate) instances: RwLock<HashMap<InstanceId, Subscribers>>,
    pub(crate) external: RwLock<Option<Arc<dyn ExternalSignaller>>>,
}

/// A notification point with ordered subscribers.
#[derive(Clone)]
pub struct Signal {
    pub(crate) inner: Arc<Inner>,
}

impl Signal {
    /// Creates an unnamed signal with default options.
    pub fn new() -> Self {
        SignalBuilder::new().build()
    }

    /// Creates a named signal with default options.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        SignalBuilder::new().with_name(name).build()
    }

    /// Returns a builder for options and hooks.
    pub fn builder() -> SignalBuilder {
        SignalBuilder::new()
    }

    /// Name, once assigned.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.get().map(|n| &**n)
    }

    pub(crate) fn name_arc(&self) -> Option<Arc<str>> {
        self.inner.name.get().cloned()
    }

    /// Assigns the name.
    ///
    /// A name is set at most once; setting the same name again is a no-op,
    /// a different one is [`SignalError::AlreadyNamed`]. With an external
    /// signaller attached, the new name is registered with it.
    pub fn set_name(&self, name: impl Into<Arc<str>>) -> Result<(), SignalError> {
        let name = name.into();
        if let Err(rejected) = self.inner.name.set(Arc::clone(&name)) {
            return match self.inner.name.get() {
                Some(current) if **current == *rejected => Ok(()),
                current => Err(SignalError::AlreadyNamed {
                    current: current.map(|c| c.to_string()).unwrap_or_default(),
                    requested: rejected.to_string(),
                }),
            };
        }
        if let Some(ext) = self.external() {
            ext.register(self, &name);
        }
        Ok(())
    }

    /// Options of this signal.
    pub fn config(&self) -> &SignalConfig {
        &self.inner.config
    }

    /// Runtime handle passed to the external signaller, if configured.
    pub fn runtime(&self) -> Option<&Handle> {
        self.inner.runtime.as_ref()
    }

    /// Attaches an external signaller (replacing a previous one).
    ///
    /// If the signal is already named, the name is registered immediately.
    pub fn set_external(&self, external: Arc<dyn ExternalSignaller>) {
        *self.inner.external.write() = Some(Arc::clone(&external));
        if let Some(name) = self.name() {
            external.register(self, name);
        }
    }

    /// Attached external signaller, if any.
    pub fn external(&self) -> Option<Arc<dyn ExternalSignaller>> {
        self.inner.external.read().clone()
    }

    /// Scope of this signal for class-level operations.
    fn unbound(&self) -> BoundSignal<'_> {
        BoundSignal::new(self, None, &[])
    }

    /// Scopes this signal to one instance's partition.
    pub fn bind(&self, instance: InstanceId) -> BoundSignal<'_> {
        BoundSignal::new(self, Some(instance), &[])
    }

    /// Connects a class-level handler.
    ///
    /// Returns `Some` with the connect hook's result when a hook is set.
    pub fn connect(&self, handler: Handler) -> Result<Option<Outcome>, SignalError> {
        self.unbound().connect(handler)
    }

    /// Disconnects a class-level handler; absent handlers are ignored.
    pub fn disconnect(&self, handler: &Handler) -> Result<Option<Outcome>, SignalError> {
        self.unbound().disconnect(handler)
    }

    /// Removes every class-level handler (instance partitions are kept).
    pub fn clear(&self) {
        self.unbound().clear();
    }

    /// Runs every class-level handler with `args`.
    pub fn notify(&self, args: &Args) -> Result<Outcome, SignalError> {
        self.unbound().notify(args)
    }

    /// Like [`notify`](Self::notify) with per-call options.
    pub fn notify_with(&self, args: &Args, opts: NotifyOptions) -> Result<Outcome, SignalError> {
        self.unbound().notify_with(args, opts)
    }

    /// Drops the partition of `instance`. Returns `true` if it existed.
    pub fn detach(&self, instance: InstanceId) -> bool {
        self.inner.instances.write().remove(&instance).is_some()
    }

    /// Number of instance partitions.
    pub fn instance_count(&self) -> usize {
        self.inner.instances.read().len()
    }

    /// Number of live class-level handlers.
    pub fn len(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// True if there is no live class-level handler.
    pub fn is_empty(&self) -> bool {
        self.inner.subscribers.read().is_empty()
    }

    /// Snapshot of the class-level handlers.
    pub fn subscribers(&self) -> Vec<Handler> {
        self.inner.subscribers.read().snapshot()
    }

    /// True if both handles share the same signal.
    pub fn ptr_eq(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name())
            .field("len", &self.len())
            .field("instances", &self.instance_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for a [`Signal`] with options and hooks.
///
/// ## Example
/// ```rust
/// use signalvisor::{Args, Reply, Signal, SortMode, Validator};
///
/// let sig = Signal::builder()
///     .with_name("saved")
///     .with_concurrent(true)
///     .with_sort_mode(SortMode::TopDown)
///     .with_validator(Validator::new(|args: &Args| Ok(!args.is_empty())))
///     .on_notify(|call| Ok(Reply::Many(call.proceed()?)))
///     .build();
///
/// assert_eq!(sig.name(), Some("saved"));
/// assert!(sig.config().concurrent);
/// ```
#[derive(Default)]
pub struct SignalBuilder {
    name: Option<Arc<str>>,
    config: SignalConfig,
    hooks: Hooks,
    external: Option<Arc<dyn ExternalSignaller>>,
    runtime: Option<Handle>,
}

impl SignalBuilder {
    /// Creates a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces every option at once.
    pub fn with_config(mut self, config: SignalConfig) -> Self {
        self.config = config;
        self
    }

    /// Settles pending values concurrently.
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.config.concurrent = concurrent;
        self
    }

    /// Ordering of class-declared handlers.
    pub fn with_sort_mode(mut self, mode: SortMode) -> Self {
        self.config.sort_mode = mode;
        self
    }

    /// Default for external delivery on notify.
    pub fn with_notify_external(mut self, enabled: bool) -> Self {
        self.config.notify_external = enabled;
        self
    }

    /// Enables or disables argument binding.
    pub fn with_adapt_params(mut self, adapt: bool) -> Self {
        self.config.adapt_params = adapt;
        self
    }

    /// Sets the argument validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.hooks.validator = Some(validator);
        self
    }

    /// Attaches an external signaller.
    pub fn with_external(mut self, external: Arc<dyn ExternalSignaller>) -> Self {
        self.external = Some(external);
        self
    }

    /// Runtime handle passed to the external signaller.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Wraps notification: the hook decides whether and how handlers run.
    pub fn on_notify<F>(mut self, f: F) -> Self
    where
        F: Fn(NotifyCall<'_>) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        self.hooks.notify = Some(Arc::new(f));
        self
    }

    /// Wraps connect: the hook decides whether the handler is added.
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(ConnectCall<'_>) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        self.hooks.connect = Some(Arc::new(f));
        self
    }

    /// Wraps disconnect: the hook decides whether the handler is removed.
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(ConnectCall<'_>) -> Result<Reply, BoxError> + Send + Sync + 'static,
    {
        self.hooks.disconnect = Some(Arc::new(f));
        self
    }

    /// Builds the signal, registering its name with the external signaller.
    pub fn build(self) -> Signal {
        let signal = Signal {
            inner: Arc::new(Inner {
                name: OnceLock::new(),
                config: self.config,
                hooks: self.hooks,
                runtime: self.runtime,
                subscribers: RwLock::new(Subscribers::new()),
                instances: RwLock::new(HashMap::new()),
                external: RwLock::new(self.external),
            }),
        };
        if let Some(name) = self.name {
            // Fresh OnceLock: cannot already be named.
            let _ = signal.set_name(name);
        }
        signal
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        registered: Mutex<Vec<String>>,
        published: AtomicUsize,
    }

    impl ExternalSignaller for Recorder {
        fn publish(
            &self,
            _signal: &Signal,
            _instance: Option<InstanceId>,
            _runtime: Option<&Handle>,
            _args: &Args,
        ) -> Result<Reply, BoxError> {
            self.published.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::ready("external"))
        }

        fn register(&self, _signal: &Signal, name: &str) {
            self.registered.lock().push(name.to_string());
        }
    }

    #[test]
    fn test_name_is_set_once() {
        let sig = Signal::new();
        assert_eq!(sig.name(), None);
        sig.set_name("a").unwrap();
        sig.set_name("a").unwrap();

        let err = sig.set_name("b").unwrap_err();
        assert_eq!(err.as_label(), "signal_already_named");
        assert_eq!(sig.name(), Some("a"));
    }

    #[test]
    fn test_external_registers_on_name_and_on_attach() {
        let rec = Arc::new(Recorder::default());
        let sig = Signal::builder().with_external(rec.clone()).build();
        assert!(rec.registered.lock().is_empty());
        sig.set_name("first").unwrap();

        let named = Signal::named("second");
        named.set_external(rec.clone());
        assert_eq!(*rec.registered.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_external_publish_is_appended_and_suppressible() {
        let rec = Arc::new(Recorder::default());
        let sig = Signal::builder()
            .with_name("ext")
            .with_external(rec.clone())
            .build();
        sig.connect(Handler::new("h", |_: &Args| Ok(Reply::ready(1))))
            .unwrap();

        let outcome = sig.notify(&Args::new()).unwrap();
        assert_eq!(outcome.results().unwrap(), &[json!(1), json!("external")]);

        let outcome = sig
            .notify_with(&Args::new(), NotifyOptions::default().with_external(false))
            .unwrap();
        assert_eq!(outcome.results().unwrap(), &[json!(1)]);
        assert_eq!(rec.published.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_external_in_config_wins_over_call() {
        let rec = Arc::new(Recorder::default());
        let sig = Signal::builder()
            .with_external(rec.clone())
            .with_notify_external(false)
            .build();
        sig.notify(&Args::new()).unwrap();
        assert_eq!(rec.published.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let sig = Signal::new();
        let other = sig.clone();
        other
            .connect(Handler::new("h", |_: &Args| Ok(Reply::Nothing)))
            .unwrap();
        assert!(sig.ptr_eq(&other));
        assert_eq!(sig.len(), 1);
    }

    #[test]
    fn test_clear_keeps_instance_partitions() {
        let sig = Signal::new();
        let id = InstanceId::next();
        sig.connect(Handler::new("class", |_: &Args| Ok(Reply::Nothing)))
            .unwrap();
        sig.bind(id)
            .connect(Handler::new("inst", |_: &Args| Ok(Reply::Nothing)))
            .unwrap();

        sig.clear();
        assert!(sig.is_empty());
        assert_eq!(sig.bind(id).len(), 1);
        assert!(sig.detach(id));
        assert_eq!(sig.instance_count(), 0);
    }
}
