//! # Connect/disconnect hooks.
//!
//! A signal may wrap `connect` and `disconnect` with a hook. The hook receives
//! a [`ConnectCall`] and decides what happens:
//!
//! ```text
//! connect(h) ──► hook(ConnectCall)
//!                  ├─ proceed()      add h to the partition (or remove, for disconnect)
//!                  ├─ notify(args)   run h alone, with the signal's validator/wrapper
//!                  ├─ subscribers()  inspect the partition
//!                  └─ return Reply   becomes the `Some(outcome)` of connect
//! ```
//!
//! Nothing is added or removed unless the hook calls [`ConnectCall::proceed`].

use std::fmt;
use std::sync::Arc;

use super::{BoundSignal, InstanceId, Signal};
use crate::{
    core::Outcome,
    error::{BoxError, SignalError},
    events::Args,
    handlers::{Handler, Reply},
};

/// Connect or disconnect wrapper.
pub type ConnectHook = Arc<dyn Fn(ConnectCall<'_>) -> Result<Reply, BoxError> + Send + Sync>;

/// View handed to a connect/disconnect hook.
#[derive(Clone, Copy)]
pub struct ConnectCall<'a> {
    scope: BoundSignal<'a>,
    handler: &'a Handler,
    disconnecting: bool,
}

impl<'a> ConnectCall<'a> {
    pub(crate) fn new(scope: BoundSignal<'a>, handler: &'a Handler, disconnecting: bool) -> Self {
        Self {
            scope,
            handler,
            disconnecting,
        }
    }

    pub(crate) fn run(self, hook: &ConnectHook) -> Result<Outcome, SignalError> {
        hook(self)
            .map(Outcome::from)
            .map_err(SignalError::from_boxed)
    }

    /// Handler being connected or disconnected.
    pub fn handler(&self) -> &'a Handler {
        self.handler
    }

    /// True when wrapping `disconnect`.
    pub fn is_disconnect(&self) -> bool {
        self.disconnecting
    }

    /// Signal being modified.
    pub fn signal(&self) -> &'a Signal {
        self.scope.signal()
    }

    /// Instance partition being modified, `None` at class level.
    pub fn instance(&self) -> Option<InstanceId> {
        self.scope.instance()
    }

    /// Snapshot of the partition being modified.
    pub fn subscribers(&self) -> Vec<Handler> {
        self.scope.subscribers()
    }

    /// Performs the default action. Returns `true` if the partition changed.
    pub fn proceed(&self) -> bool {
        let handler = self.handler;
        if self.disconnecting {
            self.scope.with_partition(|subs| subs.remove(handler))
        } else {
            self.scope.with_partition(|subs| subs.add(handler.clone()))
        }
    }

    /// Runs only this handler with `args`, without external delivery.
    pub fn notify(&self, args: &Args) -> Result<Outcome, SignalError> {
        self.scope.notify_one(self.handler, args)
    }
}

impl fmt::Debug for ConnectCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectCall")
            .field("handler", self.handler)
            .field("instance", &self.instance())
            .field("disconnecting", &self.disconnecting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_connect_hook_may_refuse() {
        let sig = Signal::builder()
            .on_connect(|call| {
                if call.handler().label() == "refused" {
                    return Ok(Reply::ready(false));
                }
                Ok(Reply::ready(call.proceed()))
            })
            .build();

        let refused = sig
            .connect(Handler::new("refused", |_: &Args| Ok(Reply::Nothing)))
            .unwrap()
            .unwrap();
        assert_eq!(refused.value(), Some(&json!(false)));
        assert!(sig.is_empty());

        let accepted = sig
            .connect(Handler::new("ok", |_: &Args| Ok(Reply::Nothing)))
            .unwrap()
            .unwrap();
        assert_eq!(accepted.value(), Some(&json!(true)));
        assert_eq!(sig.len(), 1);
    }

    #[test]
    fn test_connect_hook_notifies_only_the_new_handler() {
        let sig = Signal::builder()
            .on_connect(|call| {
                call.proceed();
                let outcome = call.notify(&Args::new().with_arg("state"))?;
                Ok(outcome.into_aggregate().map_or(Reply::Nothing, Reply::Many))
            })
            .build();

        sig.connect(Handler::new("old", |_: &Args| Ok(Reply::ready("old"))))
            .unwrap();
        let outcome = sig
            .connect(Handler::new("new", |args: &Args| {
                Ok(Reply::Ready(args.arg(0).cloned().unwrap_or_default()))
            }))
            .unwrap()
            .unwrap();
        assert_eq!(outcome.results().unwrap(), &[json!("state")]);
    }

    #[test]
    fn test_disconnect_hook_sees_instance() {
        let sig = Signal::builder()
            .on_disconnect(|call| {
                assert!(call.is_disconnect());
                let id = call.instance().map(InstanceId::get).unwrap_or_default();
                call.proceed();
                Ok(Reply::ready(id))
            })
            .build();
        let id = InstanceId::next();
        let h = Handler::new("h", |_: &Args| Ok(Reply::Nothing));
        sig.bind(id).connect(h.clone()).unwrap();

        let outcome = sig.bind(id).disconnect(&h).unwrap().unwrap();
        assert_eq!(outcome.value(), Some(&json!(id.get())));
        assert!(sig.bind(id).is_empty());
    }

    #[test]
    fn test_hook_error_is_execution_error() {
        let sig = Signal::builder()
            .on_connect(|_| Err("no connections".into()))
            .build();
        let err = sig
            .connect(Handler::new("h", |_: &Args| Ok(Reply::Nothing)))
            .unwrap_err();
        assert_eq!(err.as_message(), "execution failed: no connections");
    }
}
