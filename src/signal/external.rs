//! # External signaller: forwards notifications to another event system.
//!
//! A signal with an attached [`ExternalSignaller`] appends one pseudo-handler
//! at the end of every notification (unless suppressed). That pseudo-handler
//! calls [`publish`](ExternalSignaller::publish); its reply joins the results
//! like any other handler's.
//!
//! ```text
//! notify(args)
//!   h1 → h2 → … → hn → external.publish(signal, instance, runtime, args)
//! ```
//!
//! Registration happens on naming: when a named signal gets a signaller, or a
//! signal with a signaller gets a name, [`register`](ExternalSignaller::register)
//! is called once. Class descriptors call
//! [`register_class`](ExternalSignaller::register_class) when built.

use tokio::runtime::Handle;

use crate::{
    class::ClassInfo,
    error::BoxError,
    events::Args,
    handlers::Reply,
    signal::{InstanceId, Signal},
};

/// Bridge between signals and an external event system.
///
/// Implementations must be thread-safe (`Send + Sync`). `publish` runs
/// synchronously inside the notification; return [`Reply::Pending`] to do
/// asynchronous work that is awaited at settlement.
pub trait ExternalSignaller: Send + Sync {
    /// Publishes one notification.
    ///
    /// - `instance`: the bound instance, if the signal was notified through one
    /// - `runtime`: the signal's runtime handle, else the current one (if any)
    fn publish(
        &self,
        signal: &Signal,
        instance: Option<InstanceId>,
        runtime: Option<&Handle>,
        args: &Args,
    ) -> Result<Reply, BoxError>;

    /// Records the name of a signal.
    fn register(&self, signal: &Signal, name: &str);

    /// Records a class descriptor and its signals/handlers.
    ///
    /// An error aborts the class build.
    fn register_class(&self, class: &ClassInfo) -> Result<(), BoxError> {
        let _ = class;
        Ok(())
    }
}
