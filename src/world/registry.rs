//! Object registry: identifier allocation and lookup.
//!
//! Objects live in a persistent ordered map keyed by [`ObjectId`], so
//! iteration is always in ascending id order and cloning the registry for
//! a simulation fork is O(1).
//!
//! Destruction is two-phase. [`ObjectRegistry::mark_destroyed`] sets
//! `DESTROYED` and queues the id; from then on [`ObjectRegistry::find`]
//! no longer resolves it. The scheduler calls
//! [`ObjectRegistry::remove_destroyed`] at the end of the tick.

use im::OrdMap;

use super::entity::Entity;
use crate::core::{ObjectId, StatusFlags};

#[derive(Clone, Debug)]
pub struct ObjectRegistry {
    objects: OrdMap<ObjectId, Entity>,
    next_id: u32,
    pending_removal: Vec<ObjectId>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self {
            objects: OrdMap::new(),
            next_id: 1,
            pending_removal: Vec::new(),
        }
    }
}

impl ObjectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier. Identifiers are never reused.
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The identifier the next allocation will return.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub(crate) fn set_next_id(&mut self, next_id: u32) {
        self.next_id = next_id.max(1);
    }

    pub fn insert(&mut self, entity: Entity) {
        debug_assert!(entity.id.is_valid(), "inserting object with invalid id");
        if entity.is_destroyed() {
            self.pending_removal.push(entity.id);
        }
        self.objects.insert(entity.id, entity);
    }

    /// Look up a live object. Destroyed objects do not resolve.
    #[must_use]
    pub fn find(&self, id: ObjectId) -> Option<&Entity> {
        self.objects.get(&id).filter(|e| !e.is_destroyed())
    }

    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        self.objects.get_mut(&id).filter(|e| !e.is_destroyed())
    }

    /// Look up an object even if it is awaiting removal.
    #[must_use]
    pub fn find_any(&self, id: ObjectId) -> Option<&Entity> {
        self.objects.get(&id)
    }

    pub fn find_any_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        self.objects.get_mut(&id)
    }

    /// Mark an object destroyed and queue it for removal.
    ///
    /// Returns false if the id does not resolve or is already destroyed.
    pub fn mark_destroyed(&mut self, id: ObjectId) -> bool {
        match self.find_mut(id) {
            Some(entity) => {
                entity.status.insert(StatusFlags::DESTROYED);
                self.pending_removal.push(id);
                true
            }
            None => false,
        }
    }

    /// Remove every object queued by [`Self::mark_destroyed`].
    pub fn remove_destroyed(&mut self) -> Vec<Entity> {
        let mut removed = Vec::with_capacity(self.pending_removal.len());
        for id in std::mem::take(&mut self.pending_removal) {
            if let Some(entity) = self.objects.remove(&id) {
                removed.push(entity);
            }
        }
        removed
    }

    /// Live objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.objects.values().filter(|e| !e.is_destroyed())
    }

    /// Every stored object, destroyed or not, in ascending id order.
    pub fn iter_all(&self) -> impl Iterator<Item = &Entity> {
        self.objects.values()
    }

    /// Snapshot of live ids, for loops that mutate the registry.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(|e| e.id).collect()
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.find(id).is_some()
    }
}
