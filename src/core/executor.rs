//! # Executor: one notification cycle.
//!
//! An [`Executor`] owns a snapshot of the handlers to run plus the options of
//! the notifying signal. It is built fresh for every `notify` and dropped after.
//!
//! ## Flow
//! ```text
//! run(args)
//!   ├─► validator? ── reject ──► Err(ValidationFailed)
//!   ├─► wrapper?   ── yes ─────► wrapper(NotifyCall) ──► Outcome::from(reply)
//!   └─► exec_all(args) ────────► Outcome::Results(aggregate)
//!
//! exec_all(args)
//!   for handler in snapshot (in order):
//!     receiver released?  → skip
//!     declared params?    → bind args (arity errors fail the call)
//!     invoke              → Reply
//!       Ready / Pending   → appended
//!       Many(aggregate)   → spliced in place
//!       Nothing           → dropped
//!   ──► Aggregate (done if nothing is pending)
//! ```
//!
//! ## Rules
//! - Handlers are invoked one at a time, in snapshot order.
//! - The first failure aborts the call; handlers after it do not run.
//! - Failures are wrapped as [`SignalError::Execution`]; a wrapper failure
//!   that already is a [`SignalError`] is returned unchanged.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, trace};

use crate::{
    core::{aggregate::push_reply, Aggregate, NotifyCall, NotifyHook, SignalConfig, Validator},
    error::{BoxError, SignalError},
    events::Args,
    handlers::{Deferred, Handler, Reply},
    signal::InstanceId,
};

/// Result of a notification.
///
/// Without a notify wrapper this is always [`Outcome::Results`]; a wrapper may
/// return any [`Reply`], which is mapped variant by variant.
pub enum Outcome {
    /// Aggregated handler results.
    Results(Aggregate),
    /// A single value returned by a wrapper.
    Value(Value),
    /// A pending value returned by a wrapper.
    Pending(Deferred),
    /// The wrapper returned nothing.
    Nothing,
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Ready(v) => Outcome::Value(v),
            Reply::Pending(fut) => Outcome::Pending(fut),
            Reply::Many(agg) => Outcome::Results(agg),
            Reply::Nothing => Outcome::Nothing,
        }
    }
}

impl Outcome {
    /// The aggregate, for [`Outcome::Results`].
    pub fn aggregate(&self) -> Option<&Aggregate> {
        match self {
            Outcome::Results(agg) => Some(agg),
            _ => None,
        }
    }

    /// Consumes the outcome into its aggregate, for [`Outcome::Results`].
    pub fn into_aggregate(self) -> Option<Aggregate> {
        match self {
            Outcome::Results(agg) => Some(agg),
            _ => None,
        }
    }

    /// Settled results, if the outcome is a done aggregate.
    pub fn results(&self) -> Option<&[Value]> {
        self.aggregate().and_then(Aggregate::results)
    }

    /// The single value, for [`Outcome::Value`].
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True if nothing is left to await.
    pub fn is_done(&self) -> bool {
        match self {
            Outcome::Results(agg) => agg.is_done(),
            Outcome::Pending(_) => false,
            Outcome::Value(_) | Outcome::Nothing => true,
        }
    }

    /// Awaits whatever is pending and returns the final values.
    ///
    /// - `Results` → settled aggregate values
    /// - `Value(v)` → `[v]`
    /// - `Pending(f)` → `[f.await]`
    /// - `Nothing` → `[]`
    pub async fn resolve(self) -> Result<Vec<Value>, SignalError> {
        match self {
            Outcome::Results(agg) => agg.await,
            Outcome::Value(v) => Ok(vec![v]),
            Outcome::Pending(fut) => Ok(vec![fut.await.map_err(SignalError::execution)?]),
            Outcome::Nothing => Ok(Vec::new()),
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Results(agg) => f.debug_tuple("Results").field(agg).finish(),
            Outcome::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Outcome::Pending(_) => f.write_str("Pending(..)"),
            Outcome::Nothing => f.write_str("Nothing"),
        }
    }
}

/// Who is notifying: signal name and bound instance, for hooks and logs.
#[derive(Clone, Debug, Default)]
pub struct ExecContext {
    signal: Option<Arc<str>>,
    instance: Option<InstanceId>,
}

impl ExecContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal name.
    pub fn with_signal(mut self, name: Option<Arc<str>>) -> Self {
        self.signal = name;
        self
    }

    /// Sets the bound instance.
    pub fn with_instance(mut self, instance: Option<InstanceId>) -> Self {
        self.instance = instance;
        self
    }

    /// Signal name, if named.
    pub fn signal(&self) -> Option<&str> {
        self.signal.as_deref()
    }

    /// Bound instance, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    fn label(&self) -> &str {
        self.signal().unwrap_or("<unnamed>")
    }
}

/// Runs one notification over a fixed handler list.
///
/// ## Example
/// ```rust
/// use signalvisor::{Args, Executor, Handler, Reply};
///
/// let exec = Executor::new(vec![
///     Handler::new("one", |_: &Args| Ok(Reply::ready(1))),
///     Handler::new("none", |_: &Args| Ok(Reply::Nothing)),
/// ]);
/// let outcome = exec.run(&Args::new()).unwrap();
/// assert_eq!(outcome.results().unwrap(), &[serde_json::json!(1)]);
/// ```
pub struct Executor {
    endpoints: Vec<Handler>,
    concurrent: bool,
    adapt_params: bool,
    context: ExecContext,
    wrapper: Option<NotifyHook>,
    validator: Option<Validator>,
}

impl Executor {
    /// Creates an executor with default options (sequential, adapting parameters).
    pub fn new(endpoints: Vec<Handler>) -> Self {
        Self {
            endpoints,
            concurrent: false,
            adapt_params: true,
            context: ExecContext::default(),
            wrapper: None,
            validator: None,
        }
    }

    /// Copies `concurrent` and `adapt_params` from a signal config.
    pub fn with_config(mut self, config: &SignalConfig) -> Self {
        self.concurrent = config.concurrent;
        self.adapt_params = config.adapt_params;
        self
    }

    /// Sets concurrent settlement.
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Enables or disables argument binding.
    pub fn with_adapt_params(mut self, adapt: bool) -> Self {
        self.adapt_params = adapt;
        self
    }

    /// Sets the notifying context.
    pub fn with_context(mut self, context: ExecContext) -> Self {
        self.context = context;
        self
    }

    /// Sets the notify wrapper.
    pub fn with_wrapper(mut self, wrapper: Option<NotifyHook>) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Sets the argument validator.
    pub fn with_validator(mut self, validator: Option<Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Handlers in run order.
    pub fn handlers(&self) -> &[Handler] {
        &self.endpoints
    }

    /// Notifying context.
    pub fn context(&self) -> &ExecContext {
        &self.context
    }

    /// True if pending results settle concurrently.
    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }

    /// True if arguments are bound to declared parameters.
    pub fn adapts_params(&self) -> bool {
        self.adapt_params
    }

    /// Validates, then runs the wrapper or every handler.
    pub fn run(&self, args: &Args) -> Result<Outcome, SignalError> {
        if let Some(validator) = &self.validator {
            if let Err(e) = validator.check(args, self.adapt_params) {
                error!(signal = self.context.label(), error = %e.as_message(), "validation failed");
                return Err(e);
            }
        }

        let Some(wrapper) = &self.wrapper else {
            return self.exec_all(args).map(Outcome::Results);
        };
        match wrapper(NotifyCall::new(self, args)) {
            Ok(reply) => Ok(Outcome::from(reply)),
            Err(e) => {
                let err = SignalError::from_boxed(e);
                error!(signal = self.context.label(), error = %err.as_message(), "notify wrapper failed");
                Err(err)
            }
        }
    }

    /// Runs every handler in order and aggregates the replies.
    pub fn exec_all(&self, args: &Args) -> Result<Aggregate, SignalError> {
        let mut slots = Vec::with_capacity(self.endpoints.len());
        for handler in &self.endpoints {
            let Some(live) = handler.resolve() else {
                trace!(signal = self.context.label(), handler = handler.label(), "receiver released, skipped");
                continue;
            };

            let reply = match handler.signature().filter(|_| self.adapt_params) {
                Some(params) => params
                    .bind(args)
                    .map_err(BoxError::from)
                    .and_then(|bound| live.invoke(&bound)),
                None => live.invoke(args),
            };
            let reply = reply.map_err(|e| {
                error!(
                    signal = self.context.label(),
                    handler = handler.label(),
                    error = %e,
                    "handler failed"
                );
                SignalError::Execution { source: e }
            })?;

            push_reply(&mut slots, reply)?;
        }
        Ok(Aggregate::from_slots(slots, self.concurrent))
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("handlers", &self.endpoints)
            .field("concurrent", &self.concurrent)
            .field("adapt_params", &self.adapt_params)
            .field("context", &self.context)
            .field("wrapper", &self.wrapper.is_some())
            .field("validator", &self.validator)
            .finish()
    }
}
