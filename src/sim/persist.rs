//! Whole-simulation save, load and checksum.
//!
//! Stream layout, all through [`Xfer`]:
//!
//! * simulation header: version, frame, RNG seed and word position, LOD
//!   scale, next object id, team upgrades;
//! * every object in id order: id, template name, object state, then one
//!   entry per module slot holding its kind name, wake frame and a
//!   length-prefixed block with the module's own versioned state.
//!
//! Module data and templates are never written. Loading rebuilds each
//! object's modules from its template and checks that the saved layout
//! matches before reading module state back in.

use std::sync::Arc;

use tracing::debug;

use super::{GameData, Simulation};
use crate::core::{
    Coord3, GameRng, GameRngState, ModelConditions, ObjectId, SimConfig, StatusFlags, TeamId, UpdateSleep,
    UpgradeMask, XferError, FOREVER,
};
use crate::modules::{Module, ModuleHandle};
use crate::world::{AiState, Entity, ModuleSlot};
use crate::xfer::{xfer_enum, Xfer, XferCrc, XferLoad, XferSave, XferVersion};

const SIMULATION_VERSION: XferVersion = 1;
const ENTITY_VERSION: XferVersion = 1;

/// Damage tier thresholds, needed to rebuild a body's tier on load.
#[derive(Clone, Copy)]
struct Thresholds {
    damaged: f32,
    really_damaged: f32,
}

impl Thresholds {
    fn of(config: &SimConfig) -> Self {
        Self {
            damaged: config.damaged_threshold,
            really_damaged: config.really_damaged_threshold,
        }
    }
}

impl Simulation {
    /// Serialize the whole simulation. Call between ticks.
    pub fn save(&self) -> Result<Vec<u8>, XferError> {
        debug_assert_eq!(self.dispatch_depth, 0, "save called from inside a module");
        let mut out = XferSave::new();
        let thresholds = Thresholds::of(&self.config);

        let mut version = SIMULATION_VERSION;
        out.xfer_version(&mut version, SIMULATION_VERSION, "Simulation")?;
        let mut frame = self.frame;
        out.xfer_u32(&mut frame)?;
        xfer_rng_state(&mut out, &mut self.rng.state())?;
        let mut scale = self.slow_death_scale;
        out.xfer_f32(&mut scale)?;
        let mut next_id = self.objects.next_id();
        out.xfer_u32(&mut next_id)?;

        let mut teams = self.team_upgrades.len() as u32;
        out.xfer_u32(&mut teams)?;
        for (team, mask) in &self.team_upgrades {
            let (mut team, mut mask) = (*team, *mask);
            out.xfer_u8(&mut team.0)?;
            out.xfer_u64(&mut mask.0)?;
        }

        let mut count = self.objects.iter_all().count() as u32;
        out.xfer_u32(&mut count)?;
        for entity in self.objects.iter_all() {
            save_entity(&mut out, &mut entity.clone(), thresholds)?;
        }
        debug!(frame = self.frame, objects = count, bytes = out.len(), "simulation saved");
        Ok(out.into_bytes())
    }

    /// Rebuild a simulation from [`Simulation::save`] output.
    ///
    /// `config` and `data` must match the saving simulation's. Terrain is
    /// map data and is not saved; attach it with [`Simulation::with_terrain`].
    pub fn load(bytes: &[u8], config: SimConfig, data: Arc<GameData>) -> Result<Self, XferError> {
        let mut sim = Self::from_shared(config, data)?;
        let thresholds = Thresholds::of(&sim.config);
        let mut input = XferLoad::new(bytes);

        let mut version = SIMULATION_VERSION;
        input.xfer_version(&mut version, SIMULATION_VERSION, "Simulation")?;
        input.xfer_u32(&mut sim.frame)?;
        let mut rng = sim.rng.state();
        xfer_rng_state(&mut input, &mut rng)?;
        sim.rng = GameRng::from_state(&rng);
        input.xfer_f32(&mut sim.slow_death_scale)?;
        let mut next_id = 1;
        input.xfer_u32(&mut next_id)?;

        let mut teams = 0u32;
        input.xfer_u32(&mut teams)?;
        for _ in 0..teams {
            let (mut team, mut mask) = (TeamId(0), UpgradeMask::NONE);
            input.xfer_u8(&mut team.0)?;
            input.xfer_u64(&mut mask.0)?;
            sim.team_upgrades.insert(team, mask);
        }

        let mut count = 0u32;
        input.xfer_u32(&mut count)?;
        let mut highest = 0;
        for _ in 0..count {
            let entity = load_entity(&mut input, &sim.data, thresholds)?;
            highest = highest.max(entity.id.raw());
            sim.objects.insert(entity);
        }
        if !input.is_exhausted() {
            return Err(XferError::BlockSize {
                what: "Simulation",
                consumed: input.consumed(),
                len: input.total_len(),
            });
        }
        sim.objects.set_next_id(next_id.max(highest + 1));

        let queued: Vec<(ModuleHandle, u32)> = sim
            .objects
            .iter_all()
            .flat_map(|e| {
                e.modules
                    .iter()
                    .enumerate()
                    .map(move |(i, s)| (ModuleHandle::new(e.id, i as u16), s.wake_frame))
            })
            .filter(|(_, wake)| *wake != FOREVER)
            .collect();
        for (handle, wake) in queued {
            sim.scheduler.reschedule(handle, FOREVER, wake);
        }

        sim.load_post_process();
        debug!(frame = sim.frame, objects = count, "simulation loaded");
        Ok(sim)
    }

    /// Let every module fix up references to other objects.
    fn load_post_process(&mut self) {
        let handles: Vec<ModuleHandle> = self
            .objects
            .iter_all()
            .flat_map(|e| (0..e.modules.len() as u16).map(move |slot| ModuleHandle::new(e.id, slot)))
            .collect();

        for handle in handles {
            let slot = usize::from(handle.slot);
            let Some(mut module) = self
                .objects
                .find_any_mut(handle.object)
                .and_then(|e| e.modules.get_mut(slot))
                .and_then(|s| s.module.take())
            else {
                continue;
            };
            let sleep = module.load_post_process(self, handle);
            if let Some(s) = self.objects.find_any_mut(handle.object).and_then(|e| e.modules.get_mut(slot)) {
                s.module = Some(module);
            }

            if let Some(sleep) = sleep {
                let wake = match sleep {
                    UpdateSleep::NextFrame => self.frame,
                    other => other.wake_frame(self.frame),
                };
                let current = self.wake_frame(handle).unwrap_or(FOREVER);
                self.set_wake(handle, wake.min(current));
            }
        }
    }

    /// Checksum of all gameplay state: frame, RNG, and every object and module.
    pub fn crc(&self) -> Result<u32, XferError> {
        let mut crc = XferCrc::new();
        let thresholds = Thresholds::of(&self.config);
        let mut frame = self.frame;
        crc.xfer_u32(&mut frame)?;
        xfer_rng_state(&mut crc, &mut self.rng.state())?;
        let mut next_id = self.objects.next_id();
        crc.xfer_u32(&mut next_id)?;

        for entity in self.objects.iter_all() {
            let mut copy = entity.clone();
            crc.xfer_object_id(&mut copy.id)?;
            xfer_entity_state(&mut crc, &mut copy, thresholds)?;
            for module in entity.modules.iter().filter_map(|s| s.module.as_ref()) {
                module.crc(&mut crc)?;
            }
        }
        Ok(crc.crc())
    }
}

fn xfer_rng_state(xfer: &mut dyn Xfer, state: &mut GameRngState) -> Result<(), XferError> {
    xfer.xfer_u64(&mut state.seed)?;
    let mut high = (state.word_pos >> 64) as u64;
    let mut low = state.word_pos as u64;
    xfer.xfer_u64(&mut high)?;
    xfer.xfer_u64(&mut low)?;
    state.word_pos = (u128::from(high) << 64) | u128::from(low);
    Ok(())
}

/// Object state outside its modules.
fn xfer_entity_state(xfer: &mut dyn Xfer, e: &mut Entity, thresholds: Thresholds) -> Result<(), XferError> {
    let mut version = ENTITY_VERSION;
    xfer.xfer_version(&mut version, ENTITY_VERSION, "Entity")?;

    let mut has_team = e.team.is_some();
    xfer.xfer_bool(&mut has_team)?;
    let mut team = e.team.unwrap_or(TeamId(0));
    if has_team {
        xfer.xfer_u8(&mut team.0)?;
    }
    e.team = has_team.then_some(team);

    xfer.xfer_coord3(&mut e.position)?;
    xfer.xfer_f32(&mut e.orientation)?;
    let mut status = e.status.bits();
    xfer.xfer_u32(&mut status)?;
    e.status = StatusFlags::from_bits_truncate(status);
    let mut model = e.model.bits();
    xfer.xfer_u32(&mut model)?;
    e.model = ModelConditions::from_bits_truncate(model);

    xfer.xfer_f32(&mut e.body.health)?;
    xfer.xfer_f32(&mut e.body.max_health)?;
    if xfer.is_loading() {
        e.body.refresh_damage_state(thresholds.damaged, thresholds.really_damaged);
    }

    let mut has_ai = e.ai.is_some();
    xfer.xfer_bool(&mut has_ai)?;
    if has_ai {
        let mut ai = e.ai.unwrap_or_else(|| AiState::new(0.0, 0.0));
        xfer_ai(xfer, &mut ai)?;
        e.ai = Some(ai);
    } else {
        e.ai = None;
    }

    let mut has_contain = e.contain.is_some();
    xfer.xfer_bool(&mut has_contain)?;
    if has_contain {
        let mut contain = e.contain.take().unwrap_or_default();
        xfer.xfer_u32(&mut contain.capacity)?;
        xfer.xfer_object_id_list(&mut contain.contained)?;
        e.contain = Some(contain);
    } else {
        e.contain = None;
    }

    xfer.xfer_object_id(&mut e.contained_by)?;
    xfer.xfer_coord3(&mut e.physics.velocity)?;
    xfer.xfer_bool(&mut e.physics.airborne)?;
    xfer.xfer_u64(&mut e.upgrades.0)?;
    xfer.xfer_object_id(&mut e.producer)
}

fn xfer_ai(xfer: &mut dyn Xfer, ai: &mut AiState) -> Result<(), XferError> {
    xfer.xfer_f32(&mut ai.speed)?;
    xfer.xfer_f32(&mut ai.vision_range)?;
    xfer_enum(xfer, &mut ai.locomotor)?;
    let mut has_goal = ai.goal.is_some();
    xfer.xfer_bool(&mut has_goal)?;
    let mut goal = ai.goal.unwrap_or(Coord3::zero());
    if has_goal {
        xfer.xfer_coord3(&mut goal)?;
    }
    ai.goal = has_goal.then_some(goal);
    xfer.xfer_object_id(&mut ai.victim)
}

fn save_entity(out: &mut XferSave, e: &mut Entity, thresholds: Thresholds) -> Result<(), XferError> {
    out.xfer_object_id(&mut e.id)?;
    let mut name = e.template.name.clone();
    out.xfer_string(&mut name)?;
    xfer_entity_state(out, e, thresholds)?;

    let mut count = e.modules.len() as u32;
    out.xfer_u32(&mut count)?;
    for (i, slot) in e.modules.iter_mut().enumerate() {
        let Some(module) = slot.module.as_mut() else {
            return Err(XferError::InvalidData(format!("{}: module slot {i} is running", e.id)));
        };
        let mut kind = module.kind_name().to_owned();
        out.xfer_string(&mut kind)?;
        out.xfer_u32(&mut slot.wake_frame)?;
        let mut block = XferSave::new();
        module.xfer(&mut block)?;
        out.xfer_bytes(&mut block.into_bytes())?;
    }
    Ok(())
}

fn load_entity(input: &mut XferLoad<'_>, data: &GameData, thresholds: Thresholds) -> Result<Entity, XferError> {
    let mut id = ObjectId::INVALID;
    input.xfer_object_id(&mut id)?;
    if !id.is_valid() {
        return Err(XferError::InvalidData("object with invalid id".into()));
    }
    let mut name = String::new();
    input.xfer_string(&mut name)?;
    let template = Arc::clone(data.templates.require(&name)?);

    let mut entity = Entity::new(id, Arc::clone(&template), None, Coord3::zero());
    xfer_entity_state(input, &mut entity, thresholds)?;

    let mut count = 0u32;
    input.xfer_u32(&mut count)?;
    if count as usize != template.modules.len() {
        return Err(XferError::ModuleCount {
            object: id,
            saved: count as usize,
            built: template.modules.len(),
        });
    }
    for (i, module_data) in template.modules.iter().enumerate() {
        let mut module = Module::new(module_data, data)?;
        let mut kind = String::new();
        input.xfer_string(&mut kind)?;
        if kind != module.kind_name() {
            return Err(XferError::ModuleMismatch {
                object: id,
                slot: i,
                expected: module.kind_name().to_owned(),
                found: kind,
            });
        }
        let mut wake_frame = FOREVER;
        input.xfer_u32(&mut wake_frame)?;

        let mut block = Vec::new();
        input.xfer_bytes(&mut block)?;
        let mut sub = XferLoad::new(&block);
        module.xfer(&mut sub)?;
        if !sub.is_exhausted() {
            return Err(XferError::BlockSize {
                what: module.kind_name(),
                consumed: sub.consumed(),
                len: sub.total_len(),
            });
        }

        let mut slot = ModuleSlot::new(module);
        slot.wake_frame = wake_frame;
        entity.modules.push(slot);
    }
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TeamId;
    use crate::modules::{DestroyDieData, SlowDeathData};
    use crate::world::ThingTemplate;

    fn game() -> GameData {
        GameData::new()
            .with_upgrade("Armor")
            .with_template(
                ThingTemplate::new("Tank")
                    .with_ai(2.0, 80.0)
                    .with_module(SlowDeathData {
                        destruction_delay: 40,
                        sink_delay: 10,
                        sink_rate: 0.5,
                        ..Default::default()
                    }),
            )
            .with_template(ThingTemplate::new("Crate").with_container(2).with_module(DestroyDieData::default()))
    }

    fn config() -> SimConfig {
        SimConfig::default().with_seed(17)
    }

    fn busy_sim() -> Simulation {
        let mut sim = Simulation::new(config(), game()).unwrap();
        let a = sim.create_object("Tank", Some(TeamId(1)), Coord3::zero()).unwrap();
        let b = sim.create_object("Tank", Some(TeamId(2)), Coord3::new(20.0, 0.0, 0.0)).unwrap();
        let c = sim.create_object("Crate", None, Coord3::new(5.0, 5.0, 0.0)).unwrap();
        sim.give_team_upgrade(TeamId(1), "Armor").unwrap();
        sim.move_to(b, Coord3::new(100.0, 0.0, 0.0));
        sim.contain(c, a);
        sim.run(3);
        sim.release(c, a);
        sim.kill(a);
        sim.run(5);
        sim
    }

    #[test]
    fn test_round_trip_continues_identically() {
        let mut original = busy_sim();
        let bytes = original.save().unwrap();
        let mut restored = Simulation::load(&bytes, config(), Arc::clone(original.data())).unwrap();

        assert_eq!(restored.frame(), original.frame());
        assert_eq!(restored.crc().unwrap(), original.crc().unwrap());
        assert_eq!(restored.save().unwrap(), bytes);

        original.run(60);
        restored.run(60);
        assert_eq!(restored.crc().unwrap(), original.crc().unwrap());
        assert_eq!(restored.objects().len(), original.objects().len());
    }

    #[test]
    fn test_crc_tracks_state() {
        let sim = busy_sim();
        let mut other = sim.fork();
        assert_eq!(sim.crc().unwrap(), other.crc().unwrap());
        other.rng_mut().random_int(0, 10);
        assert_ne!(sim.crc().unwrap(), other.crc().unwrap());
    }

    #[test]
    fn test_unknown_template_rejected() {
        let bytes = busy_sim().save().unwrap();
        let data = Arc::new(GameData::new().with_upgrade("Armor"));
        let err = Simulation::load(&bytes, config(), data).unwrap_err();
        assert!(matches!(err, XferError::Config(_)));
    }

    #[test]
    fn test_module_layout_mismatch_rejected() {
        let bytes = busy_sim().save().unwrap();
        let data = Arc::new(
            GameData::new()
                .with_upgrade("Armor")
                .with_template(ThingTemplate::new("Tank").with_ai(2.0, 80.0))
                .with_template(ThingTemplate::new("Crate").with_container(2).with_module(DestroyDieData::default())),
        );
        let err = Simulation::load(&bytes, config(), data).unwrap_err();
        assert!(matches!(err, XferError::ModuleCount { saved: 1, built: 0, .. }));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let bytes = busy_sim().save().unwrap();
        let data = Arc::new(game());
        assert!(Simulation::load(&bytes[..bytes.len() - 3], config(), Arc::clone(&data)).is_err());

        let mut padded = bytes.clone();
        padded.push(0);
        let err = Simulation::load(&padded, config(), data).unwrap_err();
        assert!(matches!(err, XferError::BlockSize { what: "Simulation", .. }));
    }

    #[test]
    fn test_rng_word_position_survives() {
        let mut sim = Simulation::new(config(), game()).unwrap();
        for _ in 0..1000 {
            sim.rng_mut().random_real(0.0, 1.0);
        }
        let bytes = sim.save().unwrap();
        let mut restored = Simulation::load(&bytes, config(), Arc::clone(sim.data())).unwrap();
        assert_eq!(restored.rng_mut().random_int(0, 1 << 20), sim.rng_mut().random_int(0, 1 << 20));
    }
}
