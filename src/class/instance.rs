//! # Instance: one object attached to a class descriptor.
//!
//! An [`Instance`] owns the identity of an object's partitions in every signal
//! of its class, plus the class handlers bound to that object.
//!
//! ```text
//! ClassDef::attach(&target) ──► Instance { id, bound handlers per signal }
//!                                   │ signal("click")
//!                                   ▼
//!                      BoundSignal(click, id, declared = bound["click"])
//!
//! drop(Instance) ──► every class signal detaches partition `id`
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::ClassDef;
use crate::{
    error::SignalError,
    handlers::Handler,
    signal::{BoundSignal, InstanceId},
};

/// Per-object view of a class's signals.
pub struct Instance<T> {
    id: InstanceId,
    class: Arc<ClassDef<T>>,
    bound: HashMap<String, Vec<Handler>>,
}

impl<T> Instance<T> {
    pub(crate) fn new(id: InstanceId, class: Arc<ClassDef<T>>, bound: HashMap<String, Vec<Handler>>) -> Self {
        Self { id, class, bound }
    }

    /// Partition identity in every class signal.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Class descriptor.
    pub fn class(&self) -> &Arc<ClassDef<T>> {
        &self.class
    }

    /// Signal `name` scoped to this instance, with the class handlers bound to it.
    pub fn signal(&self, name: &str) -> Result<BoundSignal<'_>, SignalError> {
        let signal = self
            .class
            .signal_map()
            .get(name)
            .ok_or_else(|| SignalError::NoSuchSignal {
                name: name.to_string(),
            })?;
        let declared = self.bound.get(name).map_or(&[][..], Vec::as_slice);
        Ok(BoundSignal::new(signal, Some(self.id), declared))
    }
}

impl<T> Drop for Instance<T> {
    fn drop(&mut self) {
        for signal in self.class.signal_map().values() {
            signal.detach(self.id);
        }
    }
}

impl<T> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("class", &self.class.name())
            .finish()
    }
}
