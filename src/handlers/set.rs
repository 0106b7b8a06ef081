//! # Subscribers: ordered, de-duplicated handler collection
//!
//! [`Subscribers`] stores the handlers connected at runtime to one partition of
//! a signal (class level, or one instance).
//!
//! ## What it guarantees
//! - Insertion order is preserved.
//! - A handler appears at most once ([`HandlerKey`](super::HandlerKey) identity).
//! - Handlers whose receiver was released are invisible: not iterated, not
//!   counted, pruned on the next insertion.
//!
//! ## What it does **not** guarantee
//! - No internal locking; the owning signal serializes access.
//!
//! ## Diagram
//! ```text
//!    add(h3)           snapshot()
//!  ┌────┬────┬────┐   ┌────┬────┐
//!  │ h1 │ h2 │ h3 │ → │ h1 │ h3 │   (h2's receiver released)
//!  └────┴────┴────┘   └────┴────┘
//! ```

use super::Handler;

/// Ordered set of handlers.
#[derive(Clone, Debug, Default)]
pub struct Subscribers {
    entries: Vec<Handler>,
}

impl Subscribers {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` unless already present. Returns `true` if inserted.
    pub fn add(&mut self, handler: Handler) -> bool {
        self.prune();
        if self.contains(&handler) {
            return false;
        }
        self.entries.push(handler);
        true
    }

    /// Removes `handler` if present. Returns `true` if removed.
    pub fn remove(&mut self, handler: &Handler) -> bool {
        let before = self.entries.len();
        self.entries.retain(|h| h != handler);
        self.entries.len() != before
    }

    /// True if a live entry equals `handler`.
    pub fn contains(&self, handler: &Handler) -> bool {
        self.iter().any(|h| h == handler)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Live entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.entries.iter().filter(|h| h.is_alive())
    }

    /// Clones the live entries (used to snapshot before a notification).
    #[must_use]
    pub fn snapshot(&self) -> Vec<Handler> {
        self.iter().cloned().collect()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if there is no live entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Drops entries whose receiver was released, so that a reused address
    /// cannot alias a dead entry.
    fn prune(&mut self) {
        self.entries.retain(Handler::is_alive);
    }
}
