//! Signals: subscriber storage, per-instance scoping, hooks and external delivery.
//!
//! - [`Signal`] class-level handle (subscribers, options, hooks, side-table)
//! - [`BoundSignal`] a signal scoped to one [`InstanceId`] partition, merging handler sources
//! - [`ConnectCall`] view handed to connect/disconnect hooks
//! - [`ExternalSignaller`] bridge to another event system
//!
//! ## Optional
//! - `LogSignaller` (feature `logging`): external signaller that logs every publish.

mod bound;
mod external;
mod hooks;
#[cfg(feature = "logging")]
mod log;
#[allow(clippy::module_inception)]
mod signal;

pub use bound::{BoundSignal, InstanceId, NotifyOptions};
pub use external::ExternalSignaller;
pub use hooks::{ConnectCall, ConnectHook};
#[cfg(feature = "logging")]
pub use log::LogSignaller;
pub use signal::{Signal, SignalBuilder};
