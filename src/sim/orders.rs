//! Orders given to AI-driven objects, and containment.

use tracing::trace;

use super::Simulation;
use crate::core::{Coord3, LocomotorSet, ModelConditions, ObjectId, StatusFlags};

impl Simulation {
    /// Order an AI object to walk to `goal`.
    pub fn move_to(&mut self, id: ObjectId, goal: Coord3) -> bool {
        let Some(ai) = self.objects.find_mut(id).and_then(|e| e.ai.as_mut()) else {
            return false;
        };
        ai.goal = Some(goal);
        true
    }

    /// Order an AI object to attack `victim`.
    pub fn attack(&mut self, id: ObjectId, victim: ObjectId) -> bool {
        let Some(entity) = self.objects.find_mut(id) else {
            return false;
        };
        let Some(ai) = entity.ai.as_mut() else {
            return false;
        };
        ai.victim = victim;
        entity.status.insert(StatusFlags::IS_ATTACKING);
        true
    }

    /// Drop every order.
    pub fn idle(&mut self, id: ObjectId) {
        let Some(entity) = self.objects.find_mut(id) else {
            return;
        };
        if let Some(ai) = entity.ai.as_mut() {
            ai.goal = None;
            ai.victim = ObjectId::INVALID;
        }
        entity.status.remove(StatusFlags::IS_ATTACKING);
        entity.model.remove(ModelConditions::MOVING);
    }

    pub fn set_locomotor(&mut self, id: ObjectId, locomotor: LocomotorSet) {
        if let Some(ai) = self.objects.find_mut(id).and_then(|e| e.ai.as_mut()) {
            ai.locomotor = locomotor;
        }
    }

    /// Nearest live enemy within `range`, ties broken by lower id.
    #[must_use]
    pub fn closest_enemy(&self, id: ObjectId, range: f32) -> Option<ObjectId> {
        let me = self.objects.find(id)?;
        let range_sq = range * range;
        self.objects
            .iter()
            .filter(|e| e.id != id && !e.is_effectively_dead() && !e.is_contained() && me.is_enemy_of(e))
            .map(|e| (e.position.distance_sq_2d(me.position), e.id))
            .filter(|(d, _)| *d <= range_sq)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, e)| e)
    }

    /// Put `object` inside `container`. Fails if either is missing, the
    /// container is full, or `object` is already inside something.
    pub fn contain(&mut self, container: ObjectId, object: ObjectId) -> bool {
        if container == object {
            return false;
        }
        let Some(at) = self
            .objects
            .find(container)
            .filter(|c| c.contain.as_ref().is_some_and(|s| !s.is_full()))
            .map(|c| c.position)
        else {
            return false;
        };
        let Some(rider) = self.objects.find_mut(object).filter(|r| !r.is_contained()) else {
            return false;
        };
        rider.contained_by = container;
        rider.position = at;
        rider.status.insert(StatusFlags::MASKED);
        rider.model.remove(ModelConditions::MOVING);
        if let Some(ai) = rider.ai.as_mut() {
            ai.goal = None;
        }
        if let Some(state) = self.objects.find_mut(container).and_then(|c| c.contain.as_mut()) {
            state.contained.push(object);
        }
        trace!(frame = self.frame, container = %container, object = %object, "contained");
        true
    }

    /// Take `object` out of `container`, leaving it at the container's position.
    pub fn release(&mut self, container: ObjectId, object: ObjectId) -> bool {
        let Some(c) = self.objects.find_any_mut(container) else {
            return false;
        };
        let at = c.position;
        if !c.contain.as_mut().is_some_and(|s| s.remove(object)) {
            return false;
        }
        if let Some(rider) = self.objects.find_any_mut(object) {
            rider.contained_by = ObjectId::INVALID;
            rider.position = at;
            rider.status.remove(StatusFlags::MASKED);
        }
        trace!(frame = self.frame, container = %container, object = %object, "released");
        true
    }
}
