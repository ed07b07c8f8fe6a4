//! Staged, randomized death: optional fling, sinking, timed destruction.
//!
//! When an object dies, every applicable `SlowDeathBehavior` on it reports
//! a weight and exactly one is chosen by a single weighted draw (see
//! [`choose_slow_death`]). The chosen module then:
//!
//! 1. rolls its sink, midpoint and destruction frames and fires the
//!    INITIAL phase, optionally flinging the body into the air;
//! 2. each frame, sinks the body once the sink frame is reached and fires
//!    the MIDPOINT phase once;
//! 3. on the destruction frame fires the FINAL phase and destroys the body.
//!
//! Each phase triggers one random fx, one random creation list and one
//! random weapon from its lists.
//!
//! ## Level of detail
//!
//! The simulation's slow-death scale (1 = normal, 0 = instant) can change
//! while a sequence runs. Remaining frame counts are rescaled by
//! `new / old`, and scale 0 collapses the sequence to immediate
//! destruction, unless the module has effects that must not be skipped
//! (creation lists or weapons in any phase).

use std::f32::consts::TAU;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::{do_one_of_each, validate_effect_lists, CollideModule, DieModule, Module, ModuleHandle, UpdateModule};
use crate::core::{
    ConfigError, Coord3, DieMuxData, Frame, KindOf, ModelConditions, ObjectId, StatusFlags, UpdateSleep,
    XferError,
};
use crate::sim::{DamageInfo, GameData, Simulation};
use crate::xfer::Xfer;

/// Effects fired at one stage of the sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowDeathPhaseData {
    pub fx: Vec<String>,
    pub ocls: Vec<String>,
    pub weapons: Vec<String>,
}

impl SlowDeathPhaseData {
    fn has_non_lod_effects(&self) -> bool {
        !self.ocls.is_empty() || !self.weapons.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlowDeathPhase {
    Initial,
    Midpoint,
    Final,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowDeathData {
    pub die: DieMuxData,
    /// Height lost per frame while sinking.
    pub sink_rate: f32,
    /// Base selection weight; at least 1.
    pub probability_modifier: i32,
    /// Weight added per unit of overkill, as a fraction of max health.
    pub modifier_bonus_per_overkill_percent: f32,
    pub sink_delay: Frame,
    pub sink_delay_variance: Frame,
    pub destruction_delay: Frame,
    pub destruction_delay_variance: Frame,
    /// Sinking below this height destroys the body early.
    pub destruction_altitude: Option<f32>,
    /// Launch speed; no fling when zero.
    pub fling_force: f32,
    pub fling_force_variance: f32,
    /// Launch elevation in radians.
    pub fling_pitch: f32,
    pub fling_pitch_variance: f32,
    pub initial: SlowDeathPhaseData,
    pub midpoint: SlowDeathPhaseData,
    #[serde(rename = "final")]
    pub final_phase: SlowDeathPhaseData,
}

impl Default for SlowDeathData {
    fn default() -> Self {
        Self {
            die: DieMuxData::default(),
            sink_rate: 0.0,
            probability_modifier: 10,
            modifier_bonus_per_overkill_percent: 0.0,
            sink_delay: 0,
            sink_delay_variance: 0,
            destruction_delay: 0,
            destruction_delay_variance: 0,
            destruction_altitude: None,
            fling_force: 0.0,
            fling_force_variance: 0.0,
            fling_pitch: 0.0,
            fling_pitch_variance: 0.0,
            initial: SlowDeathPhaseData::default(),
            midpoint: SlowDeathPhaseData::default(),
            final_phase: SlowDeathPhaseData::default(),
        }
    }
}

impl SlowDeathData {
    #[must_use]
    pub fn phase(&self, phase: SlowDeathPhase) -> &SlowDeathPhaseData {
        match phase {
            SlowDeathPhase::Initial => &self.initial,
            SlowDeathPhase::Midpoint => &self.midpoint,
            SlowDeathPhase::Final => &self.final_phase,
        }
    }

    /// Any creation list or weapon, in any phase.
    #[must_use]
    pub fn has_non_lod_effects(&self) -> bool {
        self.initial.has_non_lod_effects()
            || self.midpoint.has_non_lod_effects()
            || self.final_phase.has_non_lod_effects()
    }

    fn check_probability(&self) -> Result<(), ConfigError> {
        if self.probability_modifier < 1 {
            return Err(ConfigError::InvalidProbabilityModifier {
                module: SlowDeathBehavior::KIND,
                value: self.probability_modifier,
            });
        }
        Ok(())
    }

    pub fn validate(&self, game: &GameData) -> Result<(), ConfigError> {
        self.check_probability()?;
        for phase in [&self.initial, &self.midpoint, &self.final_phase] {
            validate_effect_lists(game, &phase.fx, &phase.ocls, &phase.weapons)?;
        }
        Ok(())
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct SlowDeathFlags: u8 {
        const ACTIVATED = 1 << 0;
        const MIDPOINT_EXECUTED = 1 << 1;
        const FLUNG = 1 << 2;
        const BOUNCED = 1 << 3;
    }
}

#[derive(Clone, Debug)]
pub struct SlowDeathBehavior {
    data: Arc<SlowDeathData>,
    flags: SlowDeathFlags,
    sink_frame: Frame,
    midpoint_frame: Frame,
    destruction_frame: Frame,
    /// Scale the remaining frame counts were last computed for.
    last_scale: f32,
}

impl SlowDeathBehavior {
    pub const KIND: &'static str = "SlowDeathBehavior";
    const VERSION: u8 = 2;

    pub fn new(data: Arc<SlowDeathData>) -> Result<Self, ConfigError> {
        data.check_probability()?;
        Ok(Self {
            data,
            flags: SlowDeathFlags::empty(),
            sink_frame: 0,
            midpoint_frame: 0,
            destruction_frame: 0,
            last_scale: 1.0,
        })
    }

    #[must_use]
    pub fn data(&self) -> &SlowDeathData {
        &self.data
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.flags.contains(SlowDeathFlags::ACTIVATED)
    }

    #[must_use]
    pub fn sink_frame(&self) -> Frame {
        self.sink_frame
    }

    #[must_use]
    pub fn midpoint_frame(&self) -> Frame {
        self.midpoint_frame
    }

    #[must_use]
    pub fn destruction_frame(&self) -> Frame {
        self.destruction_frame
    }

    /// Selection weight for a death caused by `damage`.
    #[must_use]
    pub fn probability_modifier(&self, damage: &DamageInfo, max_health: f32) -> i32 {
        let overkill = (damage.actual_dealt - damage.actual_clipped).max(0.0);
        let fraction = if max_health > 0.0 { overkill / max_health } else { 0.0 };
        let weight = self.data.probability_modifier as f32 + fraction * self.data.modifier_bonus_per_overkill_percent;
        (weight as i32).max(1)
    }

    /// `base` plus a uniform whole number of frames in `0..=variance`.
    fn roll_delay(sim: &mut Simulation, base: Frame, variance: Frame) -> Frame {
        let variance = i32::try_from(variance).unwrap_or(i32::MAX);
        base + sim.rng_mut().random_int(0, variance) as Frame
    }

    /// Frames from death to the midpoint phase: a whole number between 35%
    /// and 65% of `span`, rounded inward. A span too short to hold one takes
    /// the lower bound.
    fn roll_midpoint(sim: &mut Simulation, span: Frame) -> Frame {
        let span = u64::from(span);
        let lo = (span * 35).div_ceil(100);
        let hi = (span * 65 / 100).max(lo);
        let lo = i32::try_from(lo).unwrap_or(i32::MAX);
        let hi = i32::try_from(hi).unwrap_or(i32::MAX);
        sim.rng_mut().random_int(lo, hi) as Frame
    }

    fn fling(&mut self, sim: &mut Simulation, object: ObjectId) {
        let d = &self.data;
        let rng = sim.rng_mut();
        let heading = rng.random_real(0.0, TAU);
        let pitch = rng.random_real(d.fling_pitch, d.fling_pitch + d.fling_pitch_variance);
        let magnitude = rng.random_real(d.fling_force, d.fling_force + d.fling_force_variance);
        let horizontal = pitch.cos() * magnitude;
        let velocity = Coord3::new(heading.cos() * horizontal, heading.sin() * horizontal, pitch.sin() * magnitude);

        if let Some(entity) = sim.find_any_mut(object) {
            entity.status.remove(StatusFlags::DISABLED_HELD);
            entity.model.insert(ModelConditions::FLAILING);
        }
        sim.launch(object, velocity);
        self.flags.insert(SlowDeathFlags::FLUNG);
    }

    fn fire_phase(&self, sim: &mut Simulation, object: ObjectId, phase: SlowDeathPhase) {
        let p = self.data.phase(phase);
        do_one_of_each(sim, object, &p.fx, &p.ocls, &p.weapons);
    }

    fn finish(&self, sim: &mut Simulation, object: ObjectId) {
        self.fire_phase(sim, object, SlowDeathPhase::Final);
        sim.destroy_object(object);
        debug!(object = %object, frame = sim.frame(), "slow death finished");
    }

    /// Rescale remaining frame counts for a changed level-of-detail scale.
    fn apply_lod_scale(&mut self, now: Frame, scale: f32) {
        if scale == self.last_scale || self.data.has_non_lod_effects() {
            return;
        }
        if scale <= 0.0 {
            self.sink_frame = self.sink_frame.min(now);
            self.midpoint_frame = self.midpoint_frame.min(now);
            self.destruction_frame = now;
        } else if self.last_scale > 0.0 {
            let ratio = scale / self.last_scale;
            for frame in [&mut self.sink_frame, &mut self.midpoint_frame, &mut self.destruction_frame] {
                if *frame > now {
                    *frame = now + ((*frame - now) as f32 * ratio).round() as Frame;
                }
            }
        }
        self.last_scale = scale;
    }

    /// Transfer state. Version 2 added the level-of-detail scale.
    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = Self::VERSION;
        xfer.xfer_version(&mut version, Self::VERSION, Self::KIND)?;
        let mut bits = self.flags.bits();
        xfer.xfer_u8(&mut bits)?;
        self.flags = SlowDeathFlags::from_bits_truncate(bits);
        xfer.xfer_u32(&mut self.sink_frame)?;
        xfer.xfer_u32(&mut self.midpoint_frame)?;
        xfer.xfer_u32(&mut self.destruction_frame)?;
        if version >= 2 {
            xfer.xfer_f32(&mut self.last_scale)?;
        } else {
            self.last_scale = 1.0;
        }
        Ok(())
    }
}

impl DieModule for SlowDeathBehavior {
    /// Start the sequence. Only called on the module chosen for this death.
    fn on_die(&mut self, sim: &mut Simulation, this: ModuleHandle, _damage: &DamageInfo) {
        let now = sim.frame();
        let d = Arc::clone(&self.data);

        self.sink_frame = now + Self::roll_delay(sim, d.sink_delay, d.sink_delay_variance);
        self.destruction_frame = now + Self::roll_delay(sim, d.destruction_delay, d.destruction_delay_variance);
        self.midpoint_frame = now + Self::roll_midpoint(sim, self.destruction_frame - now);
        self.last_scale = 1.0;
        self.flags = SlowDeathFlags::ACTIVATED;

        if let Some(entity) = sim.find_any_mut(this.object) {
            entity.status.insert(StatusFlags::EFFECTIVELY_DEAD);
            entity.model.insert(ModelConditions::DYING);
        }
        if d.fling_force > 0.0 {
            self.fling(sim, this.object);
        }
        self.fire_phase(sim, this.object, SlowDeathPhase::Initial);

        debug!(
            object = %this.object,
            frame = now,
            sink = self.sink_frame,
            midpoint = self.midpoint_frame,
            destruction = self.destruction_frame,
            "slow death started"
        );
        sim.wake_module(this);
    }
}

impl UpdateModule for SlowDeathBehavior {
    fn update(&mut self, sim: &mut Simulation, this: ModuleHandle) -> UpdateSleep {
        if !self.is_activated() {
            return UpdateSleep::Forever;
        }
        let now = sim.frame();
        self.apply_lod_scale(now, sim.slow_death_scale());

        let Some(airborne) = sim.find(this.object).map(|e| e.physics.airborne) else {
            return UpdateSleep::Forever;
        };
        if now >= self.destruction_frame {
            self.finish(sim, this.object);
            return UpdateSleep::Forever;
        }
        if !self.flags.contains(SlowDeathFlags::MIDPOINT_EXECUTED) && now >= self.midpoint_frame {
            self.flags.insert(SlowDeathFlags::MIDPOINT_EXECUTED);
            self.fire_phase(sim, this.object, SlowDeathPhase::Midpoint);
        }
        if now >= self.sink_frame && !airborne {
            let sink_rate = self.data.sink_rate;
            let mut z = 0.0;
            if let Some(entity) = sim.find_mut(this.object) {
                entity.position.z -= sink_rate;
                entity.model.insert(ModelConditions::SINKING);
                z = entity.position.z;
            }
            if self.data.destruction_altitude.is_some_and(|alt| z < alt) {
                self.finish(sim, this.object);
                return UpdateSleep::Forever;
            }
        }
        UpdateSleep::NextFrame
    }
}

impl CollideModule for SlowDeathBehavior {
    fn on_collide(&mut self, sim: &mut Simulation, this: ModuleHandle, other: Option<ObjectId>, _at: Coord3) {
        if !self.is_activated() {
            return;
        }
        match other {
            None => {
                if self.flags.contains(SlowDeathFlags::FLUNG) && !self.flags.contains(SlowDeathFlags::BOUNCED) {
                    self.flags.insert(SlowDeathFlags::BOUNCED);
                    if let Some(entity) = sim.find_mut(this.object) {
                        entity.model.remove(ModelConditions::FLAILING);
                        entity.model.insert(ModelConditions::BOUNCING);
                    }
                }
            }
            Some(other) => {
                let shrubbery = sim.find(other).is_some_and(|e| e.is_kind(KindOf::SHRUBBERY));
                if shrubbery && sim.find(this.object).is_some() {
                    self.finish(sim, this.object);
                }
            }
        }
    }
}

/// Pick the one slow-death module that handles this death.
///
/// Candidates are the applicable slow-death modules in slot order; the pick
/// is a single weighted draw. Returns the chosen slot.
pub(crate) fn choose_slow_death(sim: &mut Simulation, object: ObjectId, damage: &DamageInfo) -> Option<u16> {
    let entity = sim.find_any(object)?;
    let mut slots: SmallVec<[u16; 4]> = SmallVec::new();
    let mut weights: SmallVec<[i32; 4]> = SmallVec::new();
    for (i, slot) in entity.modules.iter().enumerate() {
        if let Some(Module::SlowDeath(sd)) = &slot.module {
            if sd.data.die.is_die_applicable(entity.status, damage.death_type) {
                slots.push(i as u16);
                weights.push(sd.probability_modifier(damage, entity.body.max_health));
            }
        }
    }
    if slots.is_empty() {
        return None;
    }
    let pick = sim.rng_mut().pick_weighted(&weights);
    debug_assert!(pick.is_some(), "slow death weights sum to zero");
    pick.map(|i| slots[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DamageType, DeathType, GeometryInfo};
    use crate::world::ThingTemplate;
    use crate::xfer::{XferLoad, XferSave};
    use crate::SimConfig;

    fn sim_with(modules: Vec<SlowDeathData>) -> Simulation {
        let mut template = ThingTemplate::new("Tank").with_max_health(100.0);
        for m in modules {
            template = template.with_module(m);
        }
        let game = GameData::new().with_fx("FX_Boom").with_template(template);
        Simulation::new(SimConfig::default().with_seed(11), game).unwrap()
    }

    fn active(sim: &Simulation, id: ObjectId, slot: usize) -> bool {
        sim.find_any(id)
            .and_then(|e| e.module(slot))
            .and_then(Module::as_slow_death)
            .is_some_and(SlowDeathBehavior::is_activated)
    }

    #[test]
    fn test_probability_modifier_must_be_positive() {
        let data = SlowDeathData {
            probability_modifier: 0,
            ..Default::default()
        };
        assert_eq!(
            SlowDeathBehavior::new(Arc::new(data)).unwrap_err(),
            ConfigError::InvalidProbabilityModifier {
                module: SlowDeathBehavior::KIND,
                value: 0
            }
        );
    }

    #[test]
    fn test_overkill_raises_weight() {
        let m = SlowDeathBehavior::new(Arc::new(SlowDeathData {
            probability_modifier: 5,
            modifier_bonus_per_overkill_percent: 20.0,
            ..Default::default()
        }))
        .unwrap();
        let mut damage = DamageInfo::new(150.0, DamageType::Explosion, DeathType::Normal);
        damage.actual_dealt = 150.0;
        damage.actual_clipped = 50.0;
        // 100 overkill on 100 max health
        assert_eq!(m.probability_modifier(&damage, 100.0), 25);

        damage.actual_dealt = 50.0;
        assert_eq!(m.probability_modifier(&damage, 100.0), 5);
    }

    #[test]
    fn test_exactly_one_module_runs() {
        let mut sim = sim_with(vec![
            SlowDeathData { destruction_delay: 10, ..Default::default() },
            SlowDeathData { destruction_delay: 10, ..Default::default() },
            SlowDeathData { destruction_delay: 10, ..Default::default() },
        ]);
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.kill(tank);

        let running = (0..3).filter(|slot| active(&sim, tank, *slot)).count();
        assert_eq!(running, 1);
        assert!(sim.find(tank).unwrap().is_effectively_dead());
    }

    #[test]
    fn test_die_filter_excludes_candidates() {
        let mut sim = sim_with(vec![
            SlowDeathData {
                die: DieMuxData::for_deaths(&[DeathType::Burned]),
                probability_modifier: 1000,
                ..Default::default()
            },
            SlowDeathData::default(),
        ]);
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.kill_with(tank, DeathType::Crushed);
        assert!(!active(&sim, tank, 0));
        assert!(active(&sim, tank, 1));
    }

    #[test]
    fn test_phases_and_destruction() {
        let phase = SlowDeathPhaseData {
            fx: vec!["FX_Boom".into()],
            ..Default::default()
        };
        let mut sim = sim_with(vec![SlowDeathData {
            destruction_delay: 20,
            initial: phase.clone(),
            midpoint: phase.clone(),
            final_phase: phase,
            ..Default::default()
        }]);
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.kill(tank);
        assert_eq!(sim.effects().len(), 1);

        sim.run(20);
        assert!(sim.find(tank).is_some());
        sim.run(1);
        assert!(sim.find(tank).is_none());

        let fx = sim.effects().iter().filter(|e| e.fx_name().is_some()).count();
        assert_eq!(fx, 3);
    }

    #[test]
    fn test_lod_scale_shortens_remaining_time() {
        let mut sim = sim_with(vec![SlowDeathData {
            destruction_delay: 100,
            ..Default::default()
        }]);
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.kill(tank);
        sim.run(20);

        sim.set_slow_death_scale(0.5);
        sim.run(1);
        let dest = sim
            .find(tank)
            .and_then(|e| e.module(0))
            .and_then(Module::as_slow_death)
            .map(SlowDeathBehavior::destruction_frame);
        // 80 frames were left at frame 20
        assert_eq!(dest, Some(60));
    }

    #[test]
    fn test_lod_scale_zero_is_instant() {
        let mut sim = sim_with(vec![SlowDeathData {
            destruction_delay: 500,
            ..Default::default()
        }]);
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.kill(tank);
        sim.set_slow_death_scale(0.0);
        sim.tick();
        assert!(sim.find(tank).is_none());
    }

    #[test]
    fn test_fling_then_bounce() {
        let mut sim = sim_with(vec![SlowDeathData {
            destruction_delay: 300,
            fling_force: 4.0,
            fling_pitch: 1.0,
            ..Default::default()
        }]);
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.find_mut(tank).unwrap().status.insert(StatusFlags::DISABLED_HELD);
        sim.kill(tank);

        let e = sim.find(tank).unwrap();
        assert!(e.physics.airborne);
        assert!(e.model.contains(ModelConditions::FLAILING));
        assert!(!e.status.contains(StatusFlags::DISABLED_HELD));

        sim.run(30);
        let e = sim.find(tank).unwrap();
        assert!(!e.physics.airborne);
        assert!(e.model.contains(ModelConditions::BOUNCING));
        assert!(!e.model.contains(ModelConditions::FLAILING));
    }

    #[test]
    fn test_shrubbery_hit_finishes_at_once() {
        let game = GameData::new()
            .with_fx("FX_Boom")
            .with_template(
                ThingTemplate::new("Bush")
                    .with_kind(KindOf::SHRUBBERY)
                    .with_geometry(GeometryInfo::circle(50.0)),
            )
            .with_template(ThingTemplate::new("Tank").with_module(SlowDeathData {
                destruction_delay: 300,
                fling_force: 4.0,
                fling_pitch: 1.0,
                final_phase: SlowDeathPhaseData {
                    fx: vec!["FX_Boom".into()],
                    ..Default::default()
                },
                ..Default::default()
            }));
        let mut sim = Simulation::new(SimConfig::default().with_seed(11), game).unwrap();
        let bush = sim.create_object("Bush", None, Coord3::zero()).unwrap();
        let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
        sim.kill(tank);
        assert!(sim.effects().iter().all(|e| e.fx_name().is_none()));

        // first flight step lands inside the bush, well below its top
        sim.tick();
        assert!(sim.find(tank).is_none());
        assert!(sim.find(bush).is_some());
        let fx: Vec<_> = sim.effects().iter().filter_map(|e| e.fx_name()).collect();
        assert_eq!(fx, vec!["FX_Boom"]);
    }

    #[test]
    fn test_midpoint_rounds_inward() {
        let mut sim = sim_with(vec![SlowDeathData::default()]);
        for _ in 0..200 {
            let m = SlowDeathBehavior::roll_midpoint(&mut sim, 10);
            assert!((4..=6).contains(&m), "midpoint {m}");
        }
        assert_eq!(SlowDeathBehavior::roll_midpoint(&mut sim, 1), 1);
        assert_eq!(SlowDeathBehavior::roll_midpoint(&mut sim, 0), 0);
    }

    #[test]
    fn test_delay_variance_is_inclusive() {
        let mut sim = sim_with(vec![SlowDeathData::default()]);
        let rolls: Vec<Frame> = (0..200).map(|_| SlowDeathBehavior::roll_delay(&mut sim, 5, 2)).collect();
        assert!(rolls.iter().all(|r| (5..=7).contains(r)));
        assert!(rolls.contains(&5));
        assert!(rolls.contains(&7));
    }

    #[test]
    fn test_version_one_stream_loads() {
        let data = Arc::new(SlowDeathData::default());

        let mut save = XferSave::new();
        let mut version = 1;
        save.xfer_version(&mut version, 1, "v1").unwrap();
        save.xfer_u8(&mut 0b011).unwrap();
        save.xfer_u32(&mut 5).unwrap();
        save.xfer_u32(&mut 40).unwrap();
        save.xfer_u32(&mut 70).unwrap();
        let bytes = save.into_bytes();

        let mut m = SlowDeathBehavior::new(data).unwrap();
        m.last_scale = 0.25;
        let mut load = XferLoad::new(&bytes);
        m.xfer(&mut load).unwrap();
        assert!(load.is_exhausted());
        assert!(m.is_activated());
        assert!(m.flags.contains(SlowDeathFlags::MIDPOINT_EXECUTED));
        assert_eq!((m.sink_frame, m.midpoint_frame, m.destruction_frame), (5, 40, 70));
        assert_eq!(m.last_scale, 1.0);
    }

    #[test]
    fn test_current_version_round_trip() {
        let data = Arc::new(SlowDeathData::default());
        let mut m = SlowDeathBehavior::new(Arc::clone(&data)).unwrap();
        m.flags = SlowDeathFlags::ACTIVATED | SlowDeathFlags::FLUNG;
        m.sink_frame = 9;
        m.midpoint_frame = 30;
        m.destruction_frame = 60;
        m.last_scale = 0.5;

        let mut save = XferSave::new();
        m.xfer(&mut save).unwrap();
        let bytes = save.into_bytes();

        let mut restored = SlowDeathBehavior::new(data).unwrap();
        restored.xfer(&mut XferLoad::new(&bytes)).unwrap();
        assert_eq!(restored.flags, m.flags);
        assert_eq!(restored.destruction_frame, 60);
        assert_eq!(restored.last_scale, 0.5);
    }
}
