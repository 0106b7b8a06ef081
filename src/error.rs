//! Error types used by signals, executors and class descriptors.
//!
//! This module defines two error enums:
//!
//! - [`SignalError`]: failures of a notification, a hook or a class build.
//! - [`BindError`]: argument binding failures (the call-arity errors of a handler).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// Boxed error carried as the cause of a failure raised by user code
/// (handlers, validators, hooks, external signallers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by signal operations.
///
/// Raised once per failing call: the first failure aborts the remaining work of
/// that notification. Side effects already performed by earlier handlers are
/// not undone.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SignalError {
    /// The validator rejected the arguments; no handler ran.
    ///
    /// `source` is `None` when the validator simply returned `false`.
    #[error("validation of the notify arguments failed")]
    ValidationFailed {
        /// The validator's own error, if it raised one.
        #[source]
        source: Option<BoxError>,
    },

    /// A handler, the notify wrapper, or the external publish failed.
    #[error("error while executing handlers: {source}")]
    Execution {
        /// The original failure.
        #[source]
        source: BoxError,
    },

    /// A declared handler refers to a signal that does not exist in the class hierarchy.
    #[error("class {class:?}: handler {handler:?} refers to unknown signal {signal:?}")]
    UnknownSignal {
        /// Class being built.
        class: String,
        /// Member name of the offending handler.
        handler: String,
        /// Signal name the handler asked for.
        signal: String,
    },

    /// Lookup of a signal name that the class does not declare.
    #[error("no signal named {name:?}")]
    NoSuchSignal {
        /// Requested signal name.
        name: String,
    },

    /// A signal name can be assigned only once.
    #[error("signal already named {current:?}; cannot rename to {requested:?}")]
    AlreadyNamed {
        /// Name currently assigned.
        current: String,
        /// Name that was refused.
        requested: String,
    },

    /// The external signaller refused to register a class.
    #[error("error while registering class {class:?}: {source}")]
    ClassRegistration {
        /// Class being built.
        class: String,
        /// The external signaller's error.
        #[source]
        source: BoxError,
    },

    /// A previous settlement of this aggregate failed; its pending values are gone.
    #[error("results were already lost by a failed settlement")]
    Poisoned,
}

impl SignalError {
    /// Wraps an arbitrary failure as [`SignalError::Execution`].
    pub fn execution(source: impl Into<BoxError>) -> Self {
        SignalError::Execution {
            source: source.into(),
        }
    }

    /// Recovers a [`SignalError`] carried by a boxed hook error; anything
    /// else becomes [`SignalError::Execution`].
    pub(crate) fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<SignalError>() {
            Ok(inner) => *inner,
            Err(source) => SignalError::Execution { source },
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use signalvisor::SignalError;
    ///
    /// let err = SignalError::ValidationFailed { source: None };
    /// assert_eq!(err.as_label(), "signal_validation_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalError::ValidationFailed { .. } => "signal_validation_failed",
            SignalError::Execution { .. } => "signal_execution_failed",
            SignalError::UnknownSignal { .. } => "signal_unknown_reference",
            SignalError::NoSuchSignal { .. } => "signal_not_found",
            SignalError::AlreadyNamed { .. } => "signal_already_named",
            SignalError::ClassRegistration { .. } => "signal_class_registration",
            SignalError::Poisoned => "signal_results_poisoned",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SignalError::ValidationFailed { source: Some(e) } => {
                format!("validation failed: {e}")
            }
            SignalError::ValidationFailed { source: None } => {
                "validation returned false".to_string()
            }
            SignalError::Execution { source } => format!("execution failed: {source}"),
            SignalError::UnknownSignal {
                class,
                handler,
                signal,
            } => format!("unknown signal: class={class} handler={handler} signal={signal}"),
            SignalError::NoSuchSignal { name } => format!("no such signal: {name}"),
            SignalError::AlreadyNamed { current, requested } => {
                format!("already named: current={current} requested={requested}")
            }
            SignalError::ClassRegistration { class, source } => {
                format!("class registration failed: class={class} error={source}")
            }
            SignalError::Poisoned => "results poisoned".to_string(),
        }
    }

    /// True for failures raised before any handler ran.
    pub fn is_validation(&self) -> bool {
        matches!(self, SignalError::ValidationFailed { .. })
    }
}

/// # Errors produced while adapting [`Args`](crate::Args) to a parameter list.
///
/// These are the natural call-arity errors of a handler with a declared
/// [`Params`](crate::Params) list.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// More positional arguments than positional parameters.
    #[error("takes {expected} positional argument(s) but {given} were given")]
    TooManyPositional {
        /// Number of positional parameters declared.
        expected: usize,
        /// Number of positional arguments supplied.
        given: usize,
    },

    /// A parameter without default received no value.
    #[error("missing required argument {name:?}")]
    Missing {
        /// Parameter name.
        name: String,
    },

    /// A parameter received both a positional and a named value.
    #[error("got multiple values for argument {name:?}")]
    Duplicate {
        /// Parameter name.
        name: String,
    },
}

impl BindError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BindError::TooManyPositional { .. } => "bind_too_many_positional",
            BindError::Missing { .. } => "bind_missing_argument",
            BindError::Duplicate { .. } => "bind_duplicate_argument",
        }
    }
}
