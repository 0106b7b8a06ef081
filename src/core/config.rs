//! # Per-signal configuration.
//!
//! Provides [`SignalConfig`], the options a signal hands to every executor it
//! builds, and [`SortMode`], the ordering of class-declared handlers.
//!
//! Config is used in two ways:
//! 1. **Signal creation**: `Signal::builder().with_concurrent(true)...build()`
//! 2. **Executor options**: each `notify` copies the config into a fresh executor
//!
//! ## Defaults
//! - `concurrent = false` → pending values settle one at a time, in order
//! - `sort_mode = BottomUp` → base-class handlers run before derived ones
//! - `notify_external = true` → publish to the external signaller when one is attached
//! - `adapt_params = true` → adapt arguments to declared parameter lists

/// Ordering of class-declared handlers across a class hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Root class handlers first, most-derived last.
    #[default]
    BottomUp,
    /// Most-derived class handlers first, root last.
    TopDown,
}

/// Options of one signal.
///
/// ## Field semantics
/// - `concurrent`: settle pending handler values together instead of one by one
/// - `sort_mode`: order of class-declared handlers (see [`SortMode`])
/// - `notify_external`: default for the per-call external delivery switch
/// - `adapt_params`: bind call arguments to each handler's declared parameters
///
/// ## Notes
/// All fields are public for flexibility; the builder on `Signal` is the usual entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalConfig {
    /// Drive pending values concurrently at settlement.
    ///
    /// Handler *invocation* stays sequential either way; only the resolution of
    /// returned pending values may overlap.
    pub concurrent: bool,

    /// Ordering of class-declared handlers.
    pub sort_mode: SortMode,

    /// Publish to the attached external signaller on notify.
    ///
    /// Can be overridden per call with `NotifyOptions`.
    pub notify_external: bool,

    /// Adapt call arguments to declared parameter lists.
    ///
    /// - `true` = filter/default/arity-check per handler
    /// - `false` = every handler receives the caller's arguments unchanged
    pub adapt_params: bool,
}

impl SignalConfig {
    /// True if class-declared handlers are ordered most-derived first.
    #[inline]
    pub fn is_top_down(&self) -> bool {
        self.sort_mode == SortMode::TopDown
    }

    /// Effective external delivery for one call.
    ///
    /// External delivery happens only when both the signal and the call allow it.
    #[inline]
    pub fn external_enabled(&self, per_call: bool) -> bool {
        self.notify_external && per_call
    }
}

impl Default for SignalConfig {
    /// Default configuration:
    ///
    /// - `concurrent = false` (sequential settlement)
    /// - `sort_mode = SortMode::BottomUp`
    /// - `notify_external = true`
    /// - `adapt_params = true`
    fn default() -> Self {
        Self {
            concurrent: false,
            sort_mode: SortMode::default(),
            notify_external: true,
            adapt_params: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SignalConfig::default();
        assert!(!cfg.concurrent);
        assert!(!cfg.is_top_down());
        assert!(cfg.notify_external);
        assert!(cfg.adapt_params);
    }

    #[test]
    fn test_external_requires_both_switches() {
        let mut cfg = SignalConfig::default();
        assert!(cfg.external_enabled(true));
        assert!(!cfg.external_enabled(false));

        cfg.notify_external = false;
        assert!(!cfg.external_enabled(true));
    }
}
