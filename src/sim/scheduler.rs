//! Sleep queue for update modules.
//!
//! Entries are keyed by `(wake frame, object id, slot)`, so draining the
//! queue visits due modules in a fixed order that depends only on
//! simulation state. The authoritative wake frame of a module lives in its
//! [`ModuleSlot`](crate::world::ModuleSlot); the queue mirrors every slot
//! whose wake frame is not [`FOREVER`].

use std::collections::BTreeSet;

use crate::core::{Frame, ObjectId, FOREVER};
use crate::modules::ModuleHandle;
use crate::world::Entity;

#[derive(Clone, Debug, Default)]
pub struct SleepQueue {
    entries: BTreeSet<(Frame, ObjectId, u16)>,
}

impl SleepQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `handle` from `old` to `new`. `FOREVER` means not queued.
    pub fn reschedule(&mut self, handle: ModuleHandle, old: Frame, new: Frame) {
        if old != FOREVER {
            self.entries.remove(&(old, handle.object, handle.slot));
        }
        if new != FOREVER {
            self.entries.insert((new, handle.object, handle.slot));
        }
    }

    /// Remove and return the first entry due on or before `now`.
    pub fn pop_due(&mut self, now: Frame) -> Option<ModuleHandle> {
        let first = *self.entries.first()?;
        if first.0 > now {
            return None;
        }
        self.entries.remove(&first);
        Some(ModuleHandle::new(first.1, first.2))
    }

    /// Drop every entry belonging to `entity`.
    pub fn remove_entity(&mut self, entity: &Entity) {
        for (slot, m) in entity.modules.iter().enumerate() {
            if m.wake_frame != FOREVER {
                self.entries.remove(&(m.wake_frame, entity.id, slot as u16));
            }
        }
    }

    /// Earliest queued wake frame.
    #[must_use]
    pub fn next_wake(&self) -> Option<Frame> {
        self.entries.first().map(|e| e.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
