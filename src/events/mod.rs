//! Notification payload.
//!
//! ## Contents
//! - [`Args`] positional + named call arguments handed to every handler
//!
//! ## Quick reference
//! - **Producers**: callers of `Signal::notify` / `BoundSignal::notify`.
//! - **Consumers**: the executor (binding, validation), handlers, hooks and
//!   external signallers.

mod args;

pub use args::Args;
