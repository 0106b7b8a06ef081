//! # Executor hooks: notify wrapper and argument validator.
//!
//! Both hooks are plain values stored on a signal (builder fields) and copied
//! into every executor it builds.
//!
//! ```text
//! run(args)
//!   │
//!   ├─ Validator::check(args) ── false / error ──► ValidationFailed (no handler runs)
//!   │
//!   ├─ no wrapper ─────────────► exec_all(args)
//!   └─ wrapper(NotifyCall) ────► wrapper decides: proceed() zero or more times,
//!                                inspect handlers/args, return any Reply
//!
//! NotifyCall::handle() ──► Proceed (owned, 'static)
//!                          moved into a Reply::pending future, run after an await
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::{
    core::{Aggregate, Executor, Params},
    error::{BoxError, SignalError},
    events::Args,
    handlers::{Handler, Reply},
    signal::InstanceId,
};

/// Notify wrapper: replaces the default "run every handler" step.
pub type NotifyHook = Arc<dyn Fn(NotifyCall<'_>) -> Result<Reply, BoxError> + Send + Sync>;

/// View handed to a notify wrapper.
///
/// The handler list is read-only; [`proceed`](NotifyCall::proceed) runs the
/// default execution and may be called any number of times.
#[derive(Clone, Copy)]
pub struct NotifyCall<'a> {
    executor: &'a Executor,
    args: &'a Args,
}

impl<'a> NotifyCall<'a> {
    pub(crate) fn new(executor: &'a Executor, args: &'a Args) -> Self {
        Self { executor, args }
    }

    /// Handlers this notification would run, in order.
    pub fn handlers(&self) -> &'a [Handler] {
        self.executor.handlers()
    }

    /// Arguments of the call.
    pub fn args(&self) -> &'a Args {
        self.args
    }

    /// Instance the call is bound to, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        self.executor.context().instance()
    }

    /// Name of the notifying signal, if named.
    pub fn signal(&self) -> Option<&'a str> {
        self.executor.context().signal()
    }

    /// Runs every handler with the call arguments.
    pub fn proceed(&self) -> Result<Aggregate, SignalError> {
        self.executor.exec_all(self.args)
    }

    /// Runs every handler with replacement arguments.
    pub fn proceed_with(&self, args: &Args) -> Result<Aggregate, SignalError> {
        self.executor.exec_all(args)
    }

    /// Owned handle to the default execution.
    ///
    /// Unlike the call itself, the handle outlives the wrapper, so an async
    /// wrapper can move it into a [`Reply::pending`] future and run the
    /// handlers after its own awaits.
    pub fn handle(&self) -> Proceed {
        Proceed {
            executor: Arc::new(
                Executor::new(self.executor.handlers().to_vec())
                    .with_concurrent(self.executor.is_concurrent())
                    .with_adapt_params(self.executor.adapts_params())
                    .with_context(self.executor.context().clone()),
            ),
            args: self.args.clone(),
        }
    }
}

impl fmt::Debug for NotifyCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyCall")
            .field("signal", &self.signal())
            .field("instance", &self.instance())
            .field("handlers", &self.handlers().len())
            .field("args", &self.args)
            .finish()
    }
}

/// Default execution detached from a [`NotifyCall`].
///
/// Holds the handler snapshot and options of the notification plus its
/// arguments. Cloning is cheap; every run sees the same snapshot.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use signalvisor::{Args, BoxError, Executor, Handler, NotifyHook, Reply};
///
/// let later: NotifyHook = Arc::new(|call| {
///     let handle = call.handle();
///     Ok(Reply::pending(async move {
///         let values = handle.proceed()?.await?;
///         Ok::<_, BoxError>(serde_json::Value::from(values))
///     }))
/// });
/// let exec = Executor::new(vec![Handler::new("one", |_: &Args| Ok(Reply::ready(1)))])
///     .with_wrapper(Some(later));
/// assert!(!exec.run(&Args::new()).unwrap().is_done());
/// ```
#[derive(Clone)]
pub struct Proceed {
    executor: Arc<Executor>,
    args: Args,
}

impl Proceed {
    /// Arguments of the originating call.
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Handlers this handle runs, in order.
    pub fn handlers(&self) -> &[Handler] {
        self.executor.handlers()
    }

    /// Runs every handler with the call arguments.
    pub fn proceed(&self) -> Result<Aggregate, SignalError> {
        self.executor.exec_all(&self.args)
    }

    /// Runs every handler with replacement arguments.
    pub fn proceed_with(&self, args: &Args) -> Result<Aggregate, SignalError> {
        self.executor.exec_all(args)
    }
}

impl fmt::Debug for Proceed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proceed")
            .field("signal", &self.executor.context().signal())
            .field("handlers", &self.handlers().len())
            .field("args", &self.args)
            .finish()
    }
}

type ValidateFn = dyn Fn(&Args) -> Result<bool, BoxError> + Send + Sync;

/// Argument validator run before any handler.
///
/// A validator may declare [`Params`]; the call arguments are then adapted to
/// it exactly as for a handler, and a binding failure counts as a rejection.
///
/// ## Example
/// ```rust
/// use signalvisor::{Args, Params, Validator};
///
/// let positive = Validator::new(|args: &Args| {
///     Ok(args.arg(0).and_then(|v| v.as_i64()).is_some_and(|n| n > 0))
/// })
/// .with_params(Params::new().arg("n"));
///
/// assert!(positive.check(&Args::new().with_arg(3), true).is_ok());
/// assert!(positive.check(&Args::new().with_arg(-3), true).is_err());
/// ```
#[derive(Clone)]
pub struct Validator {
    params: Option<Arc<Params>>,
    f: Arc<ValidateFn>,
}

impl Validator {
    /// Creates a validator from a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Args) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self {
            params: None,
            f: Arc::new(f),
        }
    }

    /// Declares the parameter list the arguments are adapted to.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(Arc::new(params));
        self
    }

    /// Declared parameter list, if any.
    pub fn params(&self) -> Option<&Params> {
        self.params.as_deref()
    }

    /// Checks `args`; any rejection is [`SignalError::ValidationFailed`].
    pub fn check(&self, args: &Args, adapt: bool) -> Result<(), SignalError> {
        let args = match self.params.as_deref() {
            Some(params) if adapt => Cow::Owned(params.bind(args).map_err(|e| {
                SignalError::ValidationFailed {
                    source: Some(Box::new(e)),
                }
            })?),
            _ => Cow::Borrowed(args),
        };
        match (self.f)(&args) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SignalError::ValidationFailed { source: None }),
            Err(e) => Err(SignalError::ValidationFailed { source: Some(e) }),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::error::BindError;

    #[test]
    fn test_false_is_a_rejection_without_cause() {
        let never = Validator::new(|_: &Args| Ok(false));
        let err = never.check(&Args::new(), true).unwrap_err();
        assert!(matches!(err, SignalError::ValidationFailed { source: None }));
    }

    #[test]
    fn test_validator_error_is_kept_as_cause() {
        let broken = Validator::new(|_: &Args| Err("bad input".into()));
        let err = broken.check(&Args::new(), true).unwrap_err();
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("bad input"));
    }

    #[test]
    fn test_binding_failure_is_a_rejection() {
        let v = Validator::new(|_: &Args| Ok(true)).with_params(Params::new().arg("only"));
        let err = v
            .check(&Args::new().with_arg(1).with_arg(2), true)
            .unwrap_err();

        let cause = err.source().and_then(|e| e.downcast_ref::<BindError>());
        assert!(matches!(cause, Some(BindError::TooManyPositional { .. })));
    }

    #[test]
    fn test_binding_skipped_when_not_adapting() {
        let v = Validator::new(|args: &Args| Ok(args.len() == 2))
            .with_params(Params::new().arg("only"));
        assert!(v.check(&Args::new().with_arg(1).with_arg(2), false).is_ok());
    }
}
