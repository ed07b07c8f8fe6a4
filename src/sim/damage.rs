//! Damage and death.
//!
//! Damage requested while a module callback is running is queued and
//! applied as soon as the outermost callback returns, so a module never
//! observes its own object half-way through a damage pass. Requests made
//! from outside any callback apply immediately.
//!
//! At zero health the object becomes `EFFECTIVELY_DEAD` and its die
//! modules run in slot order. Among slow-death modules only the one picked
//! by the weighted draw runs.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::Simulation;
use crate::core::{DamageType, DeathType, ObjectId, StatusFlags};
use crate::modules::slow_death::choose_slow_death;
use crate::modules::{Module, ModuleHandle};

/// One damage request and, once applied, its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageInfo {
    pub amount: f32,
    pub damage_type: DamageType,
    pub death_type: DeathType,
    /// Object that caused the damage, or invalid.
    pub source: ObjectId,
    /// Damage taken, before clipping to remaining health.
    pub actual_dealt: f32,
    /// Damage taken, clipped to remaining health.
    pub actual_clipped: f32,
}

impl DamageInfo {
    #[must_use]
    pub fn new(amount: f32, damage_type: DamageType, death_type: DeathType) -> Self {
        Self {
            amount,
            damage_type,
            death_type,
            source: ObjectId::INVALID,
            actual_dealt: 0.0,
            actual_clipped: 0.0,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: ObjectId) -> Self {
        self.source = source;
        self
    }
}

impl Simulation {
    /// Damage `target`, or queue the damage if a module is running.
    pub fn attempt_damage(&mut self, target: ObjectId, damage: DamageInfo) {
        if self.dispatch_depth > 0 || self.draining {
            self.pending_damage.push_back((target, damage));
            return;
        }
        self.apply_damage(target, damage);
    }

    /// Kill `target` outright with a normal death.
    pub fn kill(&mut self, target: ObjectId) {
        self.kill_with(target, DeathType::Normal);
    }

    pub fn kill_with(&mut self, target: ObjectId, death_type: DeathType) {
        let Some(max_health) = self.find(target).map(|e| e.body.max_health.max(e.body.health)) else {
            return;
        };
        self.attempt_damage(target, DamageInfo::new(max_health, DamageType::Unresistable, death_type));
    }

    pub(crate) fn drain_pending_damage(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some((target, damage)) = self.pending_damage.pop_front() {
            self.apply_damage(target, damage);
        }
        self.draining = false;
    }

    fn apply_damage(&mut self, target: ObjectId, mut damage: DamageInfo) -> Option<DamageInfo> {
        let (damaged, really_damaged) = (self.config.damaged_threshold, self.config.really_damaged_threshold);
        let entity = self.objects.find_mut(target)?;
        if entity.is_effectively_dead() {
            return None;
        }
        let before = entity.body.health;
        damage.actual_dealt = damage.amount.max(0.0);
        damage.actual_clipped = damage.actual_dealt.min(before);
        entity.body.health = (before - damage.actual_dealt).max(0.0);
        entity.body.refresh_damage_state(damaged, really_damaged);
        let died = entity.body.health <= 0.0;
        let slots = entity.modules.len() as u16;
        trace!(
            frame = self.frame,
            object = %target,
            dealt = damage.actual_dealt,
            health = entity.body.health,
            "damage applied"
        );

        for slot in 0..slots {
            let handle = ModuleHandle::new(target, slot);
            self.with_module(handle, |m, sim| {
                if let Some(d) = m.as_damage() {
                    d.on_damage(sim, handle, &damage);
                }
            });
        }
        if died {
            self.on_die(target, &damage);
        }
        Some(damage)
    }

    fn on_die(&mut self, target: ObjectId, damage: &DamageInfo) {
        let Some(entity) = self.objects.find_any_mut(target) else {
            return;
        };
        entity.status.insert(StatusFlags::EFFECTIVELY_DEAD);
        let slots = entity.modules.len() as u16;
        debug!(frame = self.frame, object = %target, death = ?damage.death_type, "object died");

        let chosen = choose_slow_death(self, target, damage);
        for slot in 0..slots {
            let handle = ModuleHandle::new(target, slot);
            self.with_module(handle, |m, sim| {
                if matches!(m, Module::SlowDeath(_)) && chosen != Some(slot) {
                    return;
                }
                if let Some(d) = m.as_die() {
                    d.on_die(sim, handle, damage);
                }
            });
        }
    }
}
