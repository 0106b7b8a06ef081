//! # Call arguments carried by one notification.
//!
//! [`Args`] is the structured event-argument value every handler receives:
//! an ordered list of positional values plus a map of named values. Values are
//! [`serde_json::Value`], so heterogeneous payloads travel through one type.
//!
//! Handlers that declare a [`Params`](crate::Params) list get their `Args`
//! adapted first (filtered, defaulted, arity-checked); all others receive the
//! caller's `Args` unchanged.
//!
//! ## Example
//! ```rust
//! use signalvisor::Args;
//! use serde_json::json;
//!
//! let args = Args::new()
//!     .with_arg(1)
//!     .with_named("kw", "a");
//!
//! assert_eq!(args.arg(0), Some(&json!(1)));
//! assert_eq!(args.kwarg("kw"), Some(&json!("a")));
//! assert_eq!(args.len(), 2);
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

/// Positional and named arguments of a notification.
///
/// - `positional`: values in call order
/// - `named`: values keyed by parameter name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    /// Positional values, in call order.
    pub positional: Vec<Value>,
    /// Named values.
    pub named: BTreeMap<String, Value>,
}

impl Args {
    /// Creates empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates arguments from a list of positional values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            named: BTreeMap::new(),
        }
    }

    /// Appends a positional value.
    #[inline]
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named value (replacing a previous one with the same name).
    #[inline]
    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Positional value at `index`.
    #[inline]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Named value `name`.
    #[inline]
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Total number of values (positional + named).
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// True if no value is carried.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args::from_values(values)
    }
}
