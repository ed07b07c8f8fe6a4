//! Loose formation-following for mob members.
//!
//! A slave checks on its master every `SimConfig::mob_update_interval`
//! frames:
//!
//! - master gone or dead: the slave dies;
//! - too far behind: panic or wander toward the master's goal, and give
//!   up (destroyed) if it stays far out of reach longer than the crisis
//!   bail time;
//! - close and moving: re-roll the locomotor posture;
//! - close and engaged: keep fighting;
//! - close and idle: follow the master's lead, occasionally picking its
//!   own target.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ModuleHandle, SlavedModule, UpdateModule};
use crate::core::{ConfigError, Coord3, Frame, LocomotorSet, ObjectId, UpdateSleep, XferError};
use crate::sim::Simulation;
use crate::xfer::Xfer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobMemberSlavedData {
    pub must_catch_up_radius: f32,
    pub no_need_to_catch_up_radius: f32,
    /// Chance per idle check of picking a target independently.
    pub squirrelliness_ratio: f32,
    /// Frames spent hopelessly far behind before giving up; 0 never gives up.
    pub catch_up_crisis_bail_time: Frame,
}

impl Default for MobMemberSlavedData {
    fn default() -> Self {
        Self {
            must_catch_up_radius: 40.0,
            no_need_to_catch_up_radius: 20.0,
            squirrelliness_ratio: 0.0,
            catch_up_crisis_bail_time: 0,
        }
    }
}

impl MobMemberSlavedData {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.must_catch_up_radius < 0.0 || self.no_need_to_catch_up_radius < 0.0 {
            return Err(ConfigError::InvalidValue {
                module: MobMemberSlavedUpdate::KIND,
                field: "must_catch_up_radius",
                reason: "radii must not be negative".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.squirrelliness_ratio) {
            return Err(ConfigError::InvalidValue {
                module: MobMemberSlavedUpdate::KIND,
                field: "squirrelliness_ratio",
                reason: format!("must be within 0..=1, got {}", self.squirrelliness_ratio),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MobMemberSlavedUpdate {
    data: Arc<MobMemberSlavedData>,
    master: ObjectId,
    next_check: Frame,
    crisis_timer: Frame,
    primary_victim: ObjectId,
}

/// What a check needs to know about the master.
struct MasterView {
    position: Coord3,
    goal: Option<Coord3>,
    remaining: f32,
    idle: bool,
    victim: ObjectId,
}

impl MobMemberSlavedUpdate {
    pub const KIND: &'static str = "MobMemberSlavedUpdate";
    const VERSION: u8 = 2;

    #[must_use]
    pub fn new(data: Arc<MobMemberSlavedData>) -> Self {
        Self {
            data,
            master: ObjectId::INVALID,
            next_check: 0,
            crisis_timer: 0,
            primary_victim: ObjectId::INVALID,
        }
    }

    #[must_use]
    pub fn primary_victim(&self) -> ObjectId {
        self.primary_victim
    }

    #[must_use]
    pub fn crisis_timer(&self) -> Frame {
        self.crisis_timer
    }

    #[must_use]
    pub fn next_check(&self) -> Frame {
        self.next_check
    }

    fn check(&mut self, sim: &mut Simulation, this: ModuleHandle, elapsed: Frame) -> bool {
        let master = sim.find(self.master).filter(|m| !m.is_effectively_dead()).map(|m| MasterView {
            position: m.position,
            goal: m.ai.and_then(|ai| ai.goal),
            remaining: m.ai.map_or(0.0, |ai| ai.remaining_path(m.position)),
            idle: m.ai.map_or(true, |ai| ai.is_idle()),
            victim: m.ai.map_or(ObjectId::INVALID, |ai| ai.victim),
        });
        let Some(master) = master else {
            debug!(slave = %this.object, master = %self.master, "mob master gone");
            sim.kill(this.object);
            return false;
        };
        let Some((position, ai)) = sim.find(this.object).and_then(|e| e.ai.map(|ai| (e.position, ai))) else {
            return true;
        };
        if master.victim.is_valid() {
            self.primary_victim = master.victim;
        }

        let d = Arc::clone(&self.data);
        let dist_sq = position.distance_sq_2d(master.position);
        let radius = d.must_catch_up_radius;

        if dist_sq > radius * radius {
            let target = master.goal.unwrap_or(master.position);
            let drifted = ai.goal.map_or(true, |g| g.distance_2d(target) > d.no_need_to_catch_up_radius);
            if drifted {
                sim.move_to(this.object, target);
            }
            let own_goal = if drifted { Some(target) } else { ai.goal };
            let own_remaining = own_goal.map_or(0.0, |g| position.distance_2d(g));
            let posture = if own_remaining > master.remaining {
                LocomotorSet::Panic
            } else {
                LocomotorSet::Wander
            };
            sim.set_locomotor(this.object, posture);

            if dist_sq > 9.0 * radius * radius {
                self.crisis_timer = self.crisis_timer.saturating_add(elapsed);
                if d.catch_up_crisis_bail_time > 0 && self.crisis_timer > d.catch_up_crisis_bail_time {
                    debug!(slave = %this.object, frames = self.crisis_timer, "mob member gave up catching up");
                    sim.destroy_object(this.object);
                    return false;
                }
            } else {
                self.crisis_timer = 0;
            }
            return true;
        }

        self.crisis_timer = 0;
        if ai.is_moving() {
            let roll = sim.rng_mut().random_int(0, 2);
            let posture = LocomotorSet::from_u8(roll as u8).unwrap_or_default();
            sim.set_locomotor(this.object, posture);
            return true;
        }

        // already fighting something of its own
        if ai.victim.is_valid() && sim.find(ai.victim).is_some() {
            return true;
        }

        if master.idle {
            sim.idle(this.object);
            self.primary_victim = ObjectId::INVALID;
            return true;
        }

        if d.squirrelliness_ratio > 0.0 && sim.rng_mut().random_real(0.0, 1.0) < d.squirrelliness_ratio {
            if let Some(enemy) = sim.closest_enemy(this.object, ai.vision_range) {
                sim.attack(this.object, enemy);
                return true;
            }
        }
        if sim.find(self.primary_victim).is_some() {
            sim.attack(this.object, self.primary_victim);
        } else {
            self.primary_victim = ObjectId::INVALID;
            sim.idle(this.object);
        }
        true
    }

    /// Re-check promptly after a load if the master did not survive it.
    pub fn load_post_process(&mut self, sim: &Simulation, _this: ModuleHandle) -> Option<UpdateSleep> {
        if self.primary_victim.is_valid() && sim.find(self.primary_victim).is_none() {
            self.primary_victim = ObjectId::INVALID;
        }
        if self.master.is_valid() && sim.find(self.master).is_none() {
            self.next_check = sim.frame();
            return Some(UpdateSleep::NextFrame);
        }
        None
    }

    /// Transfer state. Version 2 added the remembered primary victim.
    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = Self::VERSION;
        xfer.xfer_version(&mut version, Self::VERSION, Self::KIND)?;
        xfer.xfer_object_id(&mut self.master)?;
        xfer.xfer_u32(&mut self.next_check)?;
        xfer.xfer_u32(&mut self.crisis_timer)?;
        if version >= 2 {
            xfer.xfer_object_id(&mut self.primary_victim)?;
        } else {
            self.primary_victim = ObjectId::INVALID;
        }
        Ok(())
    }
}

impl UpdateModule for MobMemberSlavedUpdate {
    fn update(&mut self, sim: &mut Simulation, this: ModuleHandle) -> UpdateSleep {
        if !self.master.is_valid() {
            return UpdateSleep::Forever;
        }
        let now = sim.frame();
        if now < self.next_check {
            return UpdateSleep::Until(self.next_check);
        }
        let interval = sim.config().mob_update_interval.max(1);
        if !self.check(sim, this, interval) {
            return UpdateSleep::Forever;
        }
        self.next_check = now + interval;
        UpdateSleep::Until(self.next_check)
    }
}

impl SlavedModule for MobMemberSlavedUpdate {
    fn set_master(&mut self, sim: &mut Simulation, this: ModuleHandle, master: ObjectId) {
        self.master = master;
        self.crisis_timer = 0;
        self.next_check = sim.frame() + sim.config().mob_update_interval.max(1);
        sim.wake_module(this);
    }

    fn master(&self) -> ObjectId {
        self.master
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TeamId;
    use crate::modules::{DestroyDieData, Module};
    use crate::sim::GameData;
    use crate::world::ThingTemplate;
    use crate::xfer::{XferLoad, XferSave};
    use crate::SimConfig;

    fn sim(data: MobMemberSlavedData) -> Simulation {
        let game = GameData::new()
            .with_template(ThingTemplate::new("Leader").with_ai(2.0, 100.0))
            .with_template(
                ThingTemplate::new("Rioter")
                    .with_ai(1.0, 100.0)
                    .with_module(data)
                    .with_module(DestroyDieData::default()),
            );
        Simulation::new(SimConfig::default().with_seed(2), game).unwrap()
    }

    fn state(sim: &Simulation, slave: ObjectId) -> MobMemberSlavedUpdate {
        match sim.find(slave).and_then(|e| e.module(0)) {
            Some(Module::MobMemberSlaved(m)) => m.clone(),
            _ => panic!("no mob module"),
        }
    }

    #[test]
    fn test_master_missing_kills_on_check() {
        let mut sim = sim(MobMemberSlavedData::default());
        let leader = sim.create_object("Leader", None, Coord3::zero()).unwrap();
        let slave = sim.create_object("Rioter", None, Coord3::new(5.0, 0.0, 0.0)).unwrap();
        sim.enslave(slave, leader);
        sim.tick();

        sim.destroy_object(leader);
        sim.run(15);
        assert!(sim.find(slave).is_some());
        sim.tick();
        assert!(sim.find(slave).is_none());
    }

    #[test]
    fn test_falls_behind_and_catches_up() {
        let mut sim = sim(MobMemberSlavedData::default());
        let leader = sim.create_object("Leader", None, Coord3::zero()).unwrap();
        let slave = sim.create_object("Rioter", None, Coord3::new(100.0, 0.0, 0.0)).unwrap();
        sim.enslave(slave, leader);
        sim.move_to(leader, Coord3::new(-200.0, 0.0, 0.0));
        sim.run(17);

        let ai = sim.find(slave).unwrap().ai.unwrap();
        assert_eq!(ai.goal, Some(Coord3::new(-200.0, 0.0, 0.0)));
        // further from its goal than the master is from the same goal
        assert_eq!(ai.locomotor, LocomotorSet::Panic);
    }

    #[test]
    fn test_crisis_bail_destroys() {
        let mut sim = sim(MobMemberSlavedData {
            catch_up_crisis_bail_time: 40,
            ..Default::default()
        });
        let leader = sim.create_object("Leader", None, Coord3::zero()).unwrap();
        let slave = sim.create_object("Rioter", None, Coord3::new(1000.0, 0.0, 0.0)).unwrap();
        sim.enslave(slave, leader);

        // checks at 16 and 32 grow the timer to 32
        sim.run(33);
        assert!(sim.find(slave).is_some());
        assert_eq!(state(&sim, slave).crisis_timer(), 32);
        sim.run(16);
        assert!(sim.find(slave).is_none());
    }

    #[test]
    fn test_idle_master_idles_slave_once_target_is_gone() {
        let mut sim = sim(MobMemberSlavedData::default());
        let leader = sim.create_object("Leader", Some(TeamId(1)), Coord3::zero()).unwrap();
        let enemy = sim.create_object("Leader", Some(TeamId(2)), Coord3::new(30.0, 0.0, 0.0)).unwrap();
        let slave = sim.create_object("Rioter", Some(TeamId(1)), Coord3::new(5.0, 0.0, 0.0)).unwrap();
        sim.enslave(slave, leader);

        sim.attack(leader, enemy);
        sim.run(17);
        assert_eq!(state(&sim, slave).primary_victim(), enemy);
        assert_eq!(sim.find(slave).unwrap().ai.unwrap().victim, enemy);

        // check at 32: still engaged, keeps fighting
        sim.idle(leader);
        sim.run(16);
        assert_eq!(sim.find(slave).unwrap().ai.unwrap().victim, enemy);

        // check at 48: target gone, follows the idle master
        sim.destroy_object(enemy);
        sim.run(16);
        assert!(sim.find(slave).unwrap().ai.unwrap().is_idle());
        assert_eq!(state(&sim, slave).primary_victim(), ObjectId::INVALID);
    }

    #[test]
    fn test_engaged_slave_keeps_own_target() {
        let mut sim = sim(MobMemberSlavedData::default());
        let leader = sim.create_object("Leader", Some(TeamId(1)), Coord3::zero()).unwrap();
        let theirs = sim.create_object("Leader", Some(TeamId(2)), Coord3::new(30.0, 0.0, 0.0)).unwrap();
        let mine = sim.create_object("Leader", Some(TeamId(2)), Coord3::new(-30.0, 0.0, 0.0)).unwrap();
        let slave = sim.create_object("Rioter", Some(TeamId(1)), Coord3::new(5.0, 0.0, 0.0)).unwrap();
        sim.enslave(slave, leader);

        sim.attack(leader, theirs);
        sim.attack(slave, mine);
        sim.run(17);
        assert_eq!(sim.find(slave).unwrap().ai.unwrap().victim, mine);
        assert_eq!(state(&sim, slave).primary_victim(), theirs);
    }

    #[test]
    fn test_squirrelly_slave_picks_closest_enemy() {
        let mut sim = sim(MobMemberSlavedData {
            squirrelliness_ratio: 1.0,
            ..Default::default()
        });
        let leader = sim.create_object("Leader", Some(TeamId(1)), Coord3::zero()).unwrap();
        let far = sim.create_object("Leader", Some(TeamId(2)), Coord3::new(90.0, 0.0, 0.0)).unwrap();
        let near = sim.create_object("Leader", Some(TeamId(2)), Coord3::new(15.0, 0.0, 0.0)).unwrap();
        let slave = sim.create_object("Rioter", Some(TeamId(1)), Coord3::new(5.0, 0.0, 0.0)).unwrap();
        sim.enslave(slave, leader);

        sim.attack(leader, far);
        sim.run(17);
        assert_eq!(sim.find(slave).unwrap().ai.unwrap().victim, near);
        assert_eq!(state(&sim, slave).primary_victim(), far);
    }

    #[test]
    fn test_version_one_stream_loads() {
        let mut save = XferSave::new();
        let mut version = 1;
        save.xfer_version(&mut version, 1, "v1").unwrap();
        save.xfer_object_id(&mut ObjectId(3)).unwrap();
        save.xfer_u32(&mut 48).unwrap();
        save.xfer_u32(&mut 16).unwrap();
        let bytes = save.into_bytes();

        let mut m = MobMemberSlavedUpdate::new(Arc::new(MobMemberSlavedData::default()));
        m.primary_victim = ObjectId(9);
        let mut load = XferLoad::new(&bytes);
        m.xfer(&mut load).unwrap();
        assert!(load.is_exhausted());
        assert_eq!(m.master(), ObjectId(3));
        assert_eq!((m.next_check(), m.crisis_timer()), (48, 16));
        assert_eq!(m.primary_victim(), ObjectId::INVALID);
    }

    #[test]
    fn test_squirrelliness_validated() {
        let data = MobMemberSlavedData {
            squirrelliness_ratio: 1.5,
            ..Default::default()
        };
        assert!(data.validate().is_err());
    }
}
