//! Notification core: argument binding, execution and result aggregation.
//!
//! This module contains the engine every signal delegates to:
//! - [`binder`]: adapts call arguments to a declared parameter list;
//! - [`executor`]: runs one notification over a snapshotted handler list;
//! - [`aggregate`]: combines ready and pending results, settles them;
//! - [`hooks`]: the notify wrapper and the argument validator;
//! - [`config`]: per-signal options.

mod aggregate;
mod binder;
mod config;
mod executor;
mod hooks;

pub use aggregate::Aggregate;
pub use binder::{Param, ParamKind, Params};
pub use config::{SignalConfig, SortMode};
pub use executor::{ExecContext, Executor, Outcome};
pub use hooks::{NotifyCall, NotifyHook, Proceed, Validator};
