//! Per-frame motion: ballistic flight for launched objects, straight-line
//! locomotion for AI objects with a move goal.

use smallvec::SmallVec;
use tracing::trace;

use super::Simulation;
use crate::core::{Coord3, ModelConditions, ObjectId, StatusFlags};
use crate::modules::ModuleHandle;

impl Simulation {
    /// Throw an object into the air with `velocity`, in units per frame.
    pub fn launch(&mut self, id: ObjectId, velocity: Coord3) {
        if let Some(entity) = self.objects.find_any_mut(id) {
            entity.physics.velocity = velocity;
            entity.physics.airborne = true;
            entity.model.remove(ModelConditions::MOVING);
        }
    }

    fn notify_collision(&mut self, id: ObjectId, other: Option<ObjectId>, at: Coord3) {
        for slot in 0..self.module_count(id) {
            let handle = ModuleHandle::new(id, slot);
            self.with_module(handle, |m, sim| {
                if let Some(c) = m.as_collide() {
                    c.on_collide(sim, handle, other, at);
                }
            });
        }
    }
}

pub(crate) fn step(sim: &mut Simulation) {
    step_ballistics(sim);
    step_locomotion(sim);
}

fn step_ballistics(sim: &mut Simulation) {
    let gravity = sim.config.gravity;
    let flying: Vec<ObjectId> = sim
        .objects
        .iter()
        .filter(|e| e.physics.airborne && !e.is_contained())
        .map(|e| e.id)
        .collect();

    let mut contacts: SmallVec<[(ObjectId, Option<ObjectId>, Coord3); 4]> = SmallVec::new();
    for id in flying {
        let Some(entity) = sim.objects.find_mut(id) else {
            continue;
        };
        entity.position += entity.physics.velocity;
        entity.physics.velocity.z -= gravity;

        let ground = sim.terrain.ground_height(entity.position.x, entity.position.y);
        if entity.position.z <= ground {
            entity.position.z = ground;
            entity.physics.velocity = Coord3::zero();
            entity.physics.airborne = false;
            contacts.push((id, None, entity.position));
            continue;
        }

        let pos = entity.position;
        let hit = sim
            .objects
            .iter()
            .filter(|o| o.id != id && !o.is_contained() && !o.status.contains(StatusFlags::NO_COLLISIONS))
            .find(|o| pos.z <= o.position.z + o.geometry.height && o.geometry.contains_point(o.position, o.orientation, pos))
            .map(|o| o.id);
        if let Some(other) = hit {
            contacts.push((id, Some(other), pos));
        }
    }

    for (id, other, at) in contacts {
        trace!(frame = sim.frame, object = %id, ?other, "collision");
        sim.notify_collision(id, other, at);
    }
}

fn step_locomotion(sim: &mut Simulation) {
    let walkers: Vec<ObjectId> = sim
        .objects
        .iter()
        .filter(|e| e.ai.is_some_and(|ai| ai.is_moving()))
        .filter(|e| !e.is_contained() && !e.is_effectively_dead() && !e.physics.airborne)
        .filter(|e| !e.status.contains(StatusFlags::DISABLED_HELD))
        .map(|e| e.id)
        .collect();

    for id in walkers {
        let Some(entity) = sim.objects.find_mut(id) else {
            continue;
        };
        let Some(ai) = entity.ai.as_mut() else {
            continue;
        };
        let Some(goal) = ai.goal else {
            continue;
        };
        let step = ai.step_length();
        let delta = goal - entity.position;
        let dist = delta.length_2d();

        let mut next = if dist <= step {
            ai.goal = None;
            entity.model.remove(ModelConditions::MOVING);
            goal
        } else {
            entity.model.insert(ModelConditions::MOVING);
            entity.orientation = delta.heading();
            entity.position + delta.normalized_2d() * step
        };
        next.z = sim.terrain.ground_height(next.x, next.y);
        entity.position = next;
    }
}
