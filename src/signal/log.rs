//! # LogSignaller: external signaller that logs
//!
//! A minimal [`ExternalSignaller`] that records every registration and publish
//! through `tracing`. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO signal registered signal="clicked"
//! INFO signal published signal="clicked" instance=Some(InstanceId(3)) args=Args { positional: [Number(1)], named: {} }
//! INFO class registered class="Button" signals=["clicked"] handlers=3
//! ```

use tokio::runtime::Handle;
use tracing::info;

use super::{ExternalSignaller, InstanceId, Signal};
use crate::{class::ClassInfo, error::BoxError, events::Args, handlers::Reply};

/// Logging external signaller.
#[derive(Debug, Default)]
pub struct LogSignaller;

impl LogSignaller {
    /// Construct a new [`LogSignaller`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ExternalSignaller for LogSignaller {
    fn publish(
        &self,
        signal: &Signal,
        instance: Option<InstanceId>,
        _runtime: Option<&Handle>,
        args: &Args,
    ) -> Result<Reply, BoxError> {
        info!(
            signal = signal.name().unwrap_or("<unnamed>"),
            instance = ?instance,
            args = ?args,
            "signal published"
        );
        Ok(Reply::Nothing)
    }

    fn register(&self, _signal: &Signal, name: &str) {
        info!(signal = name, "signal registered");
    }

    fn register_class(&self, class: &ClassInfo) -> Result<(), BoxError> {
        info!(
            class = class.name(),
            signals = ?class.signals(),
            handlers = class.handler_count(),
            "class registered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_publish_contributes_no_result() {
        let sig = Signal::builder()
            .with_name("logged")
            .with_external(Arc::new(LogSignaller::new()))
            .build();
        let outcome = sig.notify(&Args::new().with_arg(1)).unwrap();
        assert_eq!(outcome.results().unwrap().len(), 0);
    }
}
