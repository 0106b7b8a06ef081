//! # BoundSignal: a signal scoped to one partition.
//!
//! A [`BoundSignal`] is what connect/disconnect/notify operate on:
//! - unbound (class level): the signal's own subscribers;
//! - bound to an [`InstanceId`]: that instance's partition of the side-table,
//!   plus (when obtained from a class instance) the class-declared handlers.
//!
//! ## Merge order at notify time
//! ```text
//! declared (class, pre-sorted) ─┐
//! class-level subscribers ──────┼─► dedup by HandlerKey (first wins) ─► [+ external] ─► Executor
//! instance subscribers ─────────┘
//! ```
//!
//! The merged list is a snapshot: locks are released before any handler runs,
//! so handlers may connect or disconnect re-entrantly.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use super::{hooks::ConnectCall, ExternalSignaller, Signal};
use crate::{
    core::{ExecContext, Executor, Outcome},
    error::SignalError,
    events::Args,
    handlers::{Handler, Subscribers},
};

/// Global sequence counter for instance identities.
static INSTANCE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of one instance partition.
///
/// Ids are unique for the process lifetime and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        InstanceId(INSTANCE_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-call notify options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotifyOptions {
    /// Publish to the external signaller (if the signal allows it).
    pub notify_external: bool,
}

impl NotifyOptions {
    /// Enables or disables external delivery for this call.
    pub fn with_external(mut self, enabled: bool) -> Self {
        self.notify_external = enabled;
        self
    }
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            notify_external: true,
        }
    }
}

/// A signal scoped to class level or to one instance.
#[derive(Clone, Copy)]
pub struct BoundSignal<'a> {
    signal: &'a Signal,
    instance: Option<InstanceId>,
    declared: &'a [Handler],
}

impl<'a> BoundSignal<'a> {
    pub(crate) fn new(signal: &'a Signal, instance: Option<InstanceId>, declared: &'a [Handler]) -> Self {
        Self {
            signal,
            instance,
            declared,
        }
    }

    /// The underlying signal.
    pub fn signal(&self) -> &'a Signal {
        self.signal
    }

    /// Bound instance, `None` at class level.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Class-declared handlers taking part in every notification.
    pub fn declared(&self) -> &'a [Handler] {
        self.declared
    }

    /// Mutates this scope's partition (creating an instance partition on demand).
    pub(crate) fn with_partition<R>(&self, f: impl FnOnce(&mut Subscribers) -> R) -> R {
        let inner = &self.signal.inner;
        match self.instance {
            None => f(&mut inner.subscribers.write()),
            Some(id) => f(inner.instances.write().entry(id).or_default()),
        }
    }

    /// Snapshot of this scope's runtime partition.
    pub fn subscribers(&self) -> Vec<Handler> {
        let inner = &self.signal.inner;
        match self.instance {
            None => inner.subscribers.read().snapshot(),
            Some(id) => inner
                .instances
                .read()
                .get(&id)
                .map(Subscribers::snapshot)
                .unwrap_or_default(),
        }
    }

    /// Number of live handlers in this scope's runtime partition.
    pub fn len(&self) -> usize {
        self.subscribers().len()
    }

    /// True if this scope's runtime partition has no live handler.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connects `handler` to this scope.
    ///
    /// Without a connect hook the handler is added (idempotently) and `None`
    /// is returned; with a hook, the hook decides and its result is returned.
    pub fn connect(&self, handler: Handler) -> Result<Option<Outcome>, SignalError> {
        match &self.signal.inner.hooks.connect {
            Some(hook) => ConnectCall::new(*self, &handler, false).run(hook).map(Some),
            None => {
                self.with_partition(|subs| subs.add(handler));
                Ok(None)
            }
        }
    }

    /// Disconnects `handler` from this scope; absent handlers are ignored.
    pub fn disconnect(&self, handler: &Handler) -> Result<Option<Outcome>, SignalError> {
        match &self.signal.inner.hooks.disconnect {
            Some(hook) => ConnectCall::new(*self, handler, true).run(hook).map(Some),
            None => {
                self.with_partition(|subs| subs.remove(handler));
                Ok(None)
            }
        }
    }

    /// Empties this scope's runtime partition only.
    pub fn clear(&self) {
        let inner = &self.signal.inner;
        match self.instance {
            None => inner.subscribers.write().clear(),
            Some(id) => {
                if let Some(subs) = inner.instances.write().get_mut(&id) {
                    subs.clear();
                }
            }
        }
    }

    /// Every handler a notification would run, in order (external excluded).
    pub fn handlers(&self) -> Vec<Handler> {
        let inner = &self.signal.inner;
        let class_level = inner.subscribers.read().snapshot();
        let instance_level = match self.instance {
            Some(id) => inner
                .instances
                .read()
                .get(&id)
                .map(Subscribers::snapshot)
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        self.declared
            .iter()
            .filter(|h| h.is_alive())
            .cloned()
            .chain(class_level)
            .chain(instance_level)
            .filter(|h| seen.insert(h.key()))
            .collect()
    }

    /// Runs every handler of this scope with `args`.
    pub fn notify(&self, args: &Args) -> Result<Outcome, SignalError> {
        self.notify_with(args, NotifyOptions::default())
    }

    /// Like [`notify`](Self::notify) with per-call options.
    pub fn notify_with(&self, args: &Args, opts: NotifyOptions) -> Result<Outcome, SignalError> {
        let mut handlers = self.handlers();
        if self.signal.config().external_enabled(opts.notify_external) {
            if let Some(external) = self.signal.external() {
                handlers.push(self.external_handler(external));
            }
        }

        debug!(
            signal = self.signal.name().unwrap_or("<unnamed>"),
            instance = ?self.instance,
            handlers = handlers.len(),
            "notify"
        );
        self.executor(handlers).run(args)
    }

    /// Runs only `handler`, with this signal's hooks and options but without
    /// external delivery.
    pub(crate) fn notify_one(&self, handler: &Handler, args: &Args) -> Result<Outcome, SignalError> {
        self.executor(vec![handler.clone()]).run(args)
    }

    fn executor(&self, handlers: Vec<Handler>) -> Executor {
        let inner = &self.signal.inner;
        Executor::new(handlers)
            .with_config(&inner.config)
            .with_context(
                ExecContext::new()
                    .with_signal(self.signal.name_arc())
                    .with_instance(self.instance),
            )
            .with_wrapper(inner.hooks.notify.clone())
            .with_validator(inner.hooks.validator.clone())
    }

    /// Pseudo-handler forwarding the call to the external signaller.
    fn external_handler(&self, external: Arc<dyn ExternalSignaller>) -> Handler {
        let signal = self.signal.clone();
        let instance = self.instance;
        let runtime = signal
            .runtime()
            .cloned()
            .or_else(|| Handle::try_current().ok());
        Handler::new("external:publish", move |args: &Args| {
            external.publish(&signal, instance, runtime.as_ref(), args)
        })
    }
}

impl fmt::Debug for BoundSignal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSignal")
            .field("signal", &self.signal.name())
            .field("instance", &self.instance)
            .field("declared", &self.declared.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::handlers::Reply;

    fn value(label: &'static str, v: i64) -> Handler {
        Handler::new(label, move |_: &Args| Ok(Reply::ready(v)))
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = InstanceId::next();
        let b = InstanceId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_merge_order_and_dedup() {
        let sig = Signal::new();
        let id = InstanceId::next();
        let declared = vec![value("declared", 1)];
        let shared = value("shared", 2);

        sig.connect(shared.clone()).unwrap();
        sig.bind(id).connect(shared.clone()).unwrap();
        sig.bind(id).connect(value("inst", 3)).unwrap();

        let bound = BoundSignal::new(&sig, Some(id), &declared);
        let outcome = bound.notify(&Args::new()).unwrap();
        assert_eq!(outcome.results().unwrap(), &[json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_instances_are_isolated() {
        let sig = Signal::new();
        let (a, b) = (InstanceId::next(), InstanceId::next());
        sig.bind(a).connect(value("a", 1)).unwrap();

        assert_eq!(sig.bind(a).len(), 1);
        assert!(sig.bind(b).is_empty());
        assert!(sig.is_empty());
        assert_eq!(sig.bind(b).notify(&Args::new()).unwrap().results().unwrap().len(), 0);
    }

    #[test]
    fn test_reentrant_connect_does_not_affect_running_call() {
        let sig = Signal::new();
        let inner = sig.clone();
        sig.connect(Handler::new("adder", move |_: &Args| {
            inner.connect(Handler::new("late", |_: &Args| Ok(Reply::ready("late"))))?;
            Ok(Reply::ready("adder"))
        }))
        .unwrap();

        let first = sig.notify(&Args::new()).unwrap();
        assert_eq!(first.results().unwrap(), &[json!("adder")]);
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn test_released_receiver_is_not_called() {
        struct Target;
        let target = Arc::new(Target);
        let sig = Signal::new();
        sig.connect(Handler::method(&target, "m", |_: &Target, _: &Args| {
            Ok(Reply::ready("called"))
        }))
        .unwrap();

        drop(target);
        let outcome = sig.notify(&Args::new()).unwrap();
        assert_eq!(outcome.results().unwrap().len(), 0);
    }
}
