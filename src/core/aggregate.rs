//! # Aggregate: combined results of one notification.
//!
//! An [`Aggregate`] holds one slot per contributing handler, in handler order.
//! A slot is either a concrete value or a pending future.
//!
//! ## Lifecycle
//! ```text
//! from_replies([Ready(1), Pending(f), Many([2, Pending(g)]), Nothing])
//!         │
//!         ▼  slots: [1, f, 2, g]   (Many spliced in place, Nothing dropped)
//!         │
//!    no pending? ──yes──► done, results = values
//!         │no
//!         ▼
//!    settle().await
//!         ├─ sequential: f, then g (first failure aborts)
//!         └─ concurrent: f and g together (any failure fails)
//!         ▼
//!    done, results written back at original indices
//! ```
//!
//! ## Rules
//! - Settlement is idempotent once done.
//! - A failed settlement poisons the aggregate: the futures it consumed are gone,
//!   later calls return [`SignalError::Poisoned`].
//! - Dropping an unsettled aggregate drops its futures; since futures are lazy,
//!   work that never started never runs.

use std::fmt;
use std::future::IntoFuture;

use futures::future::{try_join_all, BoxFuture};
use serde_json::Value;

use crate::{
    error::SignalError,
    handlers::{Deferred, Reply},
};

/// One entry of an aggregate.
pub(crate) enum Slot {
    Ready(Value),
    Pending(Deferred),
}

/// Results of a notification: immediate values plus pending ones.
pub struct Aggregate {
    slots: Vec<Slot>,
    results: Option<Vec<Value>>,
    has_pending: bool,
    concurrent: bool,
    poisoned: bool,
}

impl Aggregate {
    pub(crate) fn from_slots(slots: Vec<Slot>, concurrent: bool) -> Self {
        let has_pending = slots.iter().any(|s| matches!(s, Slot::Pending(_)));
        let mut agg = Self {
            slots,
            results: None,
            has_pending,
            concurrent,
            poisoned: false,
        };
        if !has_pending {
            agg.results = Some(
                std::mem::take(&mut agg.slots)
                    .into_iter()
                    .filter_map(|s| match s {
                        Slot::Ready(v) => Some(v),
                        Slot::Pending(_) => None,
                    })
                    .collect(),
            );
        }
        agg
    }

    /// Builds an aggregate from handler replies (flattening, dropping `Nothing`).
    pub fn from_replies(
        replies: impl IntoIterator<Item = Reply>,
        concurrent: bool,
    ) -> Result<Self, SignalError> {
        let mut slots = Vec::new();
        for reply in replies {
            push_reply(&mut slots, reply)?;
        }
        Ok(Self::from_slots(slots, concurrent))
    }

    /// Builds an already-done aggregate from concrete values.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_slots(values.into_iter().map(Slot::Ready).collect(), false)
    }

    /// A done aggregate with no results.
    pub fn empty() -> Self {
        Self::from_values(std::iter::empty())
    }

    /// True once every value is available.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.results.is_some()
    }

    /// True if built from at least one pending value.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.has_pending
    }

    /// True if pending values are resolved concurrently.
    #[inline]
    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }

    /// Final results, once done.
    pub fn results(&self) -> Option<&[Value]> {
        self.results.as_deref()
    }

    /// Values available right now (all of them once done).
    pub fn ready(&self) -> Vec<&Value> {
        match &self.results {
            Some(values) => values.iter().collect(),
            None => self
                .slots
                .iter()
                .filter_map(|s| match s {
                    Slot::Ready(v) => Some(v),
                    Slot::Pending(_) => None,
                })
                .collect(),
        }
    }

    /// Number of result entries (ready + pending).
    pub fn len(&self) -> usize {
        match &self.results {
            Some(values) => values.len(),
            None => self.slots.len(),
        }
    }

    /// True if there is no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves every pending value and returns the ordered results.
    ///
    /// Returns the cached results without re-running anything once done.
    pub async fn settle(&mut self) -> Result<&[Value], SignalError> {
        if self.results.is_none() {
            if self.poisoned {
                return Err(SignalError::Poisoned);
            }
            let slots = std::mem::take(&mut self.slots);
            let settled = if self.concurrent {
                settle_concurrent(slots).await
            } else {
                settle_sequential(slots).await
            };
            match settled {
                Ok(values) => self.results = Some(values),
                Err(e) => {
                    self.poisoned = true;
                    return Err(e);
                }
            }
        }
        Ok(self.results.as_deref().unwrap_or_default())
    }

    /// Consumes a done aggregate, returning its results.
    pub fn into_results(self) -> Option<Vec<Value>> {
        self.results
    }

    /// Consumes the aggregate into slots, for flattening into a parent.
    pub(crate) fn into_slots(self) -> Result<Vec<Slot>, SignalError> {
        match self.results {
            Some(values) => Ok(values.into_iter().map(Slot::Ready).collect()),
            None if self.poisoned => Err(SignalError::Poisoned),
            None => Ok(self.slots),
        }
    }
}

/// Classifies one reply into `slots`: flatten, drop, or append.
pub(crate) fn push_reply(slots: &mut Vec<Slot>, reply: Reply) -> Result<(), SignalError> {
    match reply {
        Reply::Ready(v) => slots.push(Slot::Ready(v)),
        Reply::Pending(fut) => slots.push(Slot::Pending(fut)),
        Reply::Many(nested) => slots.extend(nested.into_slots()?),
        Reply::Nothing => {}
    }
    Ok(())
}

async fn settle_sequential(slots: Vec<Slot>) -> Result<Vec<Value>, SignalError> {
    let mut values = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Ready(v) => values.push(v),
            Slot::Pending(fut) => values.push(fut.await.map_err(SignalError::execution)?),
        }
    }
    Ok(values)
}

async fn settle_concurrent(slots: Vec<Slot>) -> Result<Vec<Value>, SignalError> {
    let mut values: Vec<Option<Value>> = Vec::with_capacity(slots.len());
    let mut pending = Vec::new();
    for (ix, slot) in slots.into_iter().enumerate() {
        match slot {
            Slot::Ready(v) => values.push(Some(v)),
            Slot::Pending(fut) => {
                values.push(None);
                pending.push(async move { fut.await.map(|v| (ix, v)) });
            }
        }
    }

    let resolved = try_join_all(pending)
        .await
        .map_err(SignalError::execution)?;
    for (ix, v) in resolved {
        values[ix] = Some(v);
    }
    Ok(values.into_iter().flatten().collect())
}

impl IntoFuture for Aggregate {
    type Output = Result<Vec<Value>, SignalError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(mut self) -> Self::IntoFuture {
        Box::pin(async move {
            self.settle().await?;
            Ok(self.results.unwrap_or_default())
        })
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("len", &self.len())
            .field("done", &self.is_done())
            .field("has_pending", &self.has_pending)
            .field("concurrent", &self.concurrent)
            .field("results", &self.results)
            .finish()
    }
}
