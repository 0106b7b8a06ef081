//! # Handlers and subscriber collections.
//!
//! This module provides the callable model consumed by the executor:
//!
//! ```text
//! Handler ──┬─ Immediate: Fn(&Args) -> Result<Reply, BoxError>
//!           └─ Deferred:  Fn(Args)  -> Future<Output = Result<Value, BoxError>>
//!
//! Reply ──┬─ Ready(Value)       appended
//!         ├─ Pending(Deferred)  appended, resolved at settlement
//!         ├─ Many(Aggregate)    flattened into the parent
//!         └─ Nothing            dropped
//! ```
//!
//! - [`Handler`] callable plus identity, optional weak receiver and parameter list
//! - [`Subscribers`] ordered, de-duplicated collection used per signal partition

mod handler;
mod set;

pub use handler::{Deferred, Handler, HandlerKey, Reply};
pub use set::Subscribers;
