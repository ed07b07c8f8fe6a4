//! Simulation objects.
//!
//! An `Entity` is plain data: position, status bits, body, optional AI,
//! container and physics state, and its behavior module slots. Behavior
//! lives in the modules; the simulation drives them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::templates::ThingTemplate;
use crate::core::{
    BodyDamageType, Coord3, Frame, GeometryInfo, KindOf, LocomotorSet, ModelConditions, ObjectId,
    StatusFlags, TeamId, UpgradeMask, FOREVER,
};
use crate::modules::Module;

/// Health pool of an object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub health: f32,
    pub max_health: f32,
    pub damage_state: BodyDamageType,
}

impl Body {
    #[must_use]
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            damage_state: BodyDamageType::Pristine,
        }
    }

    /// Remaining health as a fraction of maximum.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            self.health / self.max_health
        }
    }

    /// Recompute the damage tier from current health.
    pub fn refresh_damage_state(&mut self, damaged: f32, really_damaged: f32) {
        self.damage_state = BodyDamageType::from_ratio(self.ratio(), damaged, really_damaged);
    }
}

/// Orders and posture of an AI-driven object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    pub speed: f32,
    pub vision_range: f32,
    pub locomotor: LocomotorSet,
    /// Where the object is moving to, if anywhere.
    pub goal: Option<Coord3>,
    /// Current attack target.
    pub victim: ObjectId,
}

impl AiState {
    #[must_use]
    pub fn new(speed: f32, vision_range: f32) -> Self {
        Self {
            speed,
            vision_range,
            locomotor: LocomotorSet::Normal,
            goal: None,
            victim: ObjectId::INVALID,
        }
    }

    /// No move order and no attack target.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.goal.is_none() && !self.victim.is_valid()
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.goal.is_some()
    }

    /// Straight-line distance left to the current goal.
    #[must_use]
    pub fn remaining_path(&self, from: Coord3) -> f32 {
        self.goal.map_or(0.0, |goal| from.distance_2d(goal))
    }

    /// Distance covered per frame with the current locomotor.
    #[must_use]
    pub fn step_length(&self) -> f32 {
        self.speed * self.locomotor.speed_factor()
    }
}

/// Objects held inside a container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainState {
    pub capacity: u32,
    /// Contents in load order.
    pub contained: Vec<ObjectId>,
}

impl ContainState {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            contained: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.contained.len() >= self.capacity as usize
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.contained.contains(&id)
    }

    /// Remove `id`; returns whether it was present.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let before = self.contained.len();
        self.contained.retain(|c| *c != id);
        self.contained.len() != before
    }
}

/// Ballistic motion state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    pub velocity: Coord3,
    /// Above the ground and subject to gravity.
    pub airborne: bool,
}

/// One behavior module attached to an entity.
///
/// `module` is `None` only while the module itself is running.
#[derive(Clone, Debug)]
pub struct ModuleSlot {
    pub module: Option<Module>,
    /// Absolute frame the module next updates on, [`FOREVER`] if asleep.
    pub wake_frame: Frame,
}

impl ModuleSlot {
    #[must_use]
    pub fn new(module: Module) -> Self {
        Self {
            module: Some(module),
            wake_frame: FOREVER,
        }
    }
}

/// A simulation object.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: ObjectId,
    pub template: Arc<ThingTemplate>,
    pub position: Coord3,
    /// Heading in radians.
    pub orientation: f32,
    pub status: StatusFlags,
    pub kind: KindOf,
    pub geometry: GeometryInfo,
    pub team: Option<TeamId>,
    pub body: Body,
    pub ai: Option<AiState>,
    pub contain: Option<ContainState>,
    /// Container this object is inside, or invalid.
    pub contained_by: ObjectId,
    pub physics: PhysicsState,
    pub model: ModelConditions,
    pub upgrades: UpgradeMask,
    /// Object that created this one, or invalid.
    pub producer: ObjectId,
    pub modules: Vec<ModuleSlot>,
}

impl Entity {
    /// A fresh object built from `template`, with no modules attached yet.
    #[must_use]
    pub fn new(id: ObjectId, template: Arc<ThingTemplate>, team: Option<TeamId>, position: Coord3) -> Self {
        Self {
            id,
            position,
            orientation: 0.0,
            status: StatusFlags::empty(),
            kind: template.kind,
            geometry: template.geometry,
            team,
            body: Body::new(template.max_health),
            ai: template.ai.map(|ai| AiState::new(ai.speed, ai.vision_range)),
            contain: template.contain_capacity.map(ContainState::new),
            contained_by: ObjectId::INVALID,
            physics: PhysicsState::default(),
            model: ModelConditions::empty(),
            upgrades: UpgradeMask::NONE,
            producer: ObjectId::INVALID,
            modules: Vec::new(),
            template,
        }
    }

    #[must_use]
    pub fn template_name(&self) -> &str {
        &self.template.name
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.status.contains(StatusFlags::DESTROYED)
    }

    #[must_use]
    pub fn is_effectively_dead(&self) -> bool {
        self.status.contains(StatusFlags::EFFECTIVELY_DEAD)
    }

    #[must_use]
    pub fn is_kind(&self, kind: KindOf) -> bool {
        self.kind.intersects(kind)
    }

    #[must_use]
    pub fn is_contained(&self) -> bool {
        self.contained_by.is_valid()
    }

    /// Hostile to `other`: both on teams and the teams differ.
    #[must_use]
    pub fn is_enemy_of(&self, other: &Entity) -> bool {
        matches!((self.team, other.team), (Some(a), Some(b)) if a != b)
    }

    /// Module in `slot`, if present and not currently running.
    #[must_use]
    pub fn module(&self, slot: usize) -> Option<&Module> {
        self.modules.get(slot).and_then(|s| s.module.as_ref())
    }

    pub fn module_mut(&mut self, slot: usize) -> Option<&mut Module> {
        self.modules.get_mut(slot).and_then(|s| s.module.as_mut())
    }

    /// Index of the first module matching `pred`.
    pub fn find_module_slot(&self, pred: impl Fn(&Module) -> bool) -> Option<u16> {
        self.modules
            .iter()
            .position(|s| s.module.as_ref().is_some_and(&pred))
            .map(|i| i as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Arc<ThingTemplate> {
        Arc::new(
            ThingTemplate::new("Truck")
                .with_kind(KindOf::VEHICLE | KindOf::TRANSPORT)
                .with_max_health(200.0)
                .with_ai(4.0, 100.0)
                .with_container(2),
        )
    }

    #[test]
    fn test_entity_from_template() {
        let e = Entity::new(ObjectId(3), template(), Some(TeamId(1)), Coord3::new(1.0, 2.0, 0.0));
        assert_eq!(e.template_name(), "Truck");
        assert_eq!(e.body.health, 200.0);
        assert!(e.is_kind(KindOf::VEHICLE));
        assert!(e.ai.unwrap().is_idle());
        assert_eq!(e.contain.as_ref().unwrap().capacity, 2);
        assert!(!e.is_destroyed());
        assert!(!e.is_contained());
    }

    #[test]
    fn test_body_damage_state() {
        let mut body = Body::new(100.0);
        body.health = 50.0;
        body.refresh_damage_state(0.7, 0.35);
        assert_eq!(body.damage_state, BodyDamageType::Damaged);
        body.health = 0.0;
        body.refresh_damage_state(0.7, 0.35);
        assert_eq!(body.damage_state, BodyDamageType::Rubble);
    }

    #[test]
    fn test_enemies() {
        let a = Entity::new(ObjectId(1), template(), Some(TeamId(1)), Coord3::zero());
        let b = Entity::new(ObjectId(2), template(), Some(TeamId(2)), Coord3::zero());
        let neutral = Entity::new(ObjectId(3), template(), None, Coord3::zero());
        assert!(a.is_enemy_of(&b));
        assert!(!a.is_enemy_of(&a));
        assert!(!a.is_enemy_of(&neutral));
    }

    #[test]
    fn test_container() {
        let mut c = ContainState::new(1);
        c.contained.push(ObjectId(5));
        assert!(c.is_full());
        assert!(c.remove(ObjectId(5)));
        assert!(!c.remove(ObjectId(5)));
    }
}
