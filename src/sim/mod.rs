//! The simulation: objects, scheduler, RNG and the services modules call.
//!
//! A [`Simulation`] advances in whole frames. Each [`Simulation::tick`]
//! steps physics and locomotion, then runs every update module due on the
//! current frame in `(frame, object id, slot)` order, applies queued damage,
//! and finally removes objects destroyed during the frame.
//!
//! ```
//! use rts_behaviors::core::Coord3;
//! use rts_behaviors::modules::DestroyDieData;
//! use rts_behaviors::sim::{GameData, Simulation};
//! use rts_behaviors::world::ThingTemplate;
//! use rts_behaviors::SimConfig;
//!
//! let game = GameData::new().with_template(ThingTemplate::new("Crate").with_module(DestroyDieData::default()));
//! let mut sim = Simulation::new(SimConfig::default(), game).unwrap();
//! let id = sim.create_object("Crate", None, Coord3::zero()).unwrap();
//!
//! sim.kill(id);
//! assert!(sim.find(id).is_none());
//! sim.tick();
//! assert!(!sim.objects().contains(id));
//! ```
//!
//! Cloning a simulation is cheap: objects live in a persistent map and
//! game data is shared, so [`Simulation::fork`] can be used for lookahead.

pub mod damage;
pub mod data;
mod dispatch;
mod orders;
mod persist;
mod physics;
pub mod scheduler;

use std::collections::VecDeque;
use std::sync::Arc;

use im::OrdMap;
use tracing::{debug, trace, warn};

pub use damage::DamageInfo;
pub use data::GameData;
pub use scheduler::SleepQueue;

use crate::core::{
    ConfigError, Coord3, Frame, GameRng, ObjectId, SimConfig, TeamId, UpgradeMask, FOREVER,
};
use crate::modules::{Module, ModuleHandle};
use crate::services::EffectEvent;
use crate::world::{Entity, ModuleSlot, ObjectRegistry, Terrain};

#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimConfig,
    data: Arc<GameData>,
    terrain: Arc<Terrain>,
    frame: Frame,
    rng: GameRng,
    objects: ObjectRegistry,
    scheduler: SleepQueue,
    team_upgrades: OrdMap<TeamId, UpgradeMask>,
    slow_death_scale: f32,
    effects: Vec<EffectEvent>,
    pending_damage: VecDeque<(ObjectId, DamageInfo)>,
    /// Number of module callbacks currently on the stack.
    dispatch_depth: u32,
    draining: bool,
}

impl Simulation {
    /// A new simulation on flat terrain. Game data is validated first.
    pub fn new(config: SimConfig, data: GameData) -> Result<Self, ConfigError> {
        Self::from_shared(config, Arc::new(data))
    }

    /// Like [`Simulation::new`], sharing already-built game data.
    pub fn from_shared(config: SimConfig, data: Arc<GameData>) -> Result<Self, ConfigError> {
        data.validate()?;
        debug!(seed = config.seed, templates = data.templates.len(), "simulation created");
        Ok(Self {
            rng: GameRng::new(config.seed),
            slow_death_scale: config.slow_death_scale,
            config,
            data,
            terrain: Arc::new(Terrain::flat(0.0)),
            frame: 0,
            objects: ObjectRegistry::new(),
            scheduler: SleepQueue::new(),
            team_upgrades: OrdMap::new(),
            effects: Vec::new(),
            pending_damage: VecDeque::new(),
            dispatch_depth: 0,
            draining: false,
        })
    }

    #[must_use]
    pub fn with_terrain(mut self, terrain: Terrain) -> Self {
        self.terrain = Arc::new(terrain);
        self
    }

    /// An independent copy for lookahead.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn data(&self) -> &Arc<GameData> {
        &self.data
    }

    #[must_use]
    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    #[must_use]
    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// The frame the next [`Simulation::tick`] will run.
    #[must_use]
    pub fn frame(&self) -> Frame {
        self.frame
    }

    #[must_use]
    pub fn rng(&self) -> &GameRng {
        &self.rng
    }

    pub fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    /// Live object: not destroyed, possibly effectively dead.
    #[must_use]
    pub fn find(&self, id: ObjectId) -> Option<&Entity> {
        self.objects.find(id)
    }

    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        self.objects.find_mut(id)
    }

    /// Any object still in the registry, destroyed or not.
    #[must_use]
    pub fn find_any(&self, id: ObjectId) -> Option<&Entity> {
        self.objects.find_any(id)
    }

    pub fn find_any_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        self.objects.find_any_mut(id)
    }

    #[must_use]
    pub fn slow_death_scale(&self) -> f32 {
        self.slow_death_scale
    }

    pub fn set_slow_death_scale(&mut self, scale: f32) {
        self.slow_death_scale = scale.max(0.0);
    }

    /// Events recorded since creation or the last [`Simulation::take_effects`].
    #[must_use]
    pub fn effects(&self) -> &[EffectEvent] {
        &self.effects
    }

    pub fn take_effects(&mut self) -> Vec<EffectEvent> {
        std::mem::take(&mut self.effects)
    }

    pub(crate) fn record(&mut self, event: EffectEvent) {
        if self.config.record_effects {
            self.effects.push(event);
        }
    }

    /// Create an object from a template and attach its modules.
    pub fn create_object(&mut self, template: &str, team: Option<TeamId>, position: Coord3) -> Result<ObjectId, ConfigError> {
        let template = Arc::clone(self.data.templates.require(template)?);
        let modules = template
            .modules
            .iter()
            .map(|data| Module::new(data, &self.data))
            .collect::<Result<Vec<_>, _>>()?;

        let id = self.objects.allocate_id();
        let mut entity = Entity::new(id, template, team, position);
        let wakes: Vec<u16> = modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.wakes_on_creation())
            .map(|(i, _)| i as u16)
            .collect();
        entity.modules = modules.into_iter().map(ModuleSlot::new).collect();
        trace!(frame = self.frame, object = %id, template = entity.template_name(), "object created");
        self.objects.insert(entity);

        for slot in wakes {
            self.set_wake(ModuleHandle::new(id, slot), self.frame);
        }
        if team.is_some_and(|t| self.team_upgrades.contains_key(&t)) {
            self.notify_upgrades(id);
        }
        Ok(id)
    }

    /// Mark an object destroyed. It is removed at the end of the frame.
    ///
    /// A contained object leaves its container; a container releases its
    /// contents. Returns false if the object was already destroyed.
    pub fn destroy_object(&mut self, id: ObjectId) -> bool {
        let Some(entity) = self.objects.find(id) else {
            return false;
        };
        let container = entity.contained_by;
        let contents = entity.contain.as_ref().map(|c| c.contained.clone()).unwrap_or_default();
        if !self.objects.mark_destroyed(id) {
            return false;
        }
        if container.is_valid() {
            self.release(container, id);
        }
        for rider in contents {
            self.release(id, rider);
        }
        trace!(frame = self.frame, object = %id, "object destroyed");
        self.record(EffectEvent::ObjectDestroyed { frame: self.frame, object: id });
        true
    }

    /// Ask the scheduler to run a module on the current frame.
    ///
    /// A module already due earlier keeps its earlier frame.
    pub fn wake_module(&mut self, handle: ModuleHandle) {
        let Some(current) = self.wake_frame(handle) else {
            return;
        };
        self.set_wake(handle, current.min(self.frame));
    }

    /// Frame a module is next scheduled for, [`FOREVER`] if asleep.
    #[must_use]
    pub fn wake_frame(&self, handle: ModuleHandle) -> Option<Frame> {
        self.objects
            .find_any(handle.object)?
            .modules
            .get(usize::from(handle.slot))
            .map(|slot| slot.wake_frame)
    }

    pub(crate) fn set_wake(&mut self, handle: ModuleHandle, frame: Frame) {
        let Some(slot) = self
            .objects
            .find_mut(handle.object)
            .and_then(|e| e.modules.get_mut(usize::from(handle.slot)))
        else {
            return;
        };
        let old = std::mem::replace(&mut slot.wake_frame, frame);
        self.scheduler.reschedule(handle, old, frame);
    }

    /// Run `f` with the module at `handle` taken out of its slot.
    ///
    /// Returns `None` if there is no such module or it is already running.
    pub(crate) fn with_module<R>(
        &mut self,
        handle: ModuleHandle,
        f: impl FnOnce(&mut Module, &mut Simulation) -> R,
    ) -> Option<R> {
        let slot = usize::from(handle.slot);
        let mut module = self.objects.find_any_mut(handle.object)?.modules.get_mut(slot)?.module.take()?;

        self.dispatch_depth += 1;
        let result = f(&mut module, self);
        self.dispatch_depth -= 1;

        if let Some(s) = self.objects.find_any_mut(handle.object).and_then(|e| e.modules.get_mut(slot)) {
            s.module = Some(module);
        }
        if self.dispatch_depth == 0 {
            self.drain_pending_damage();
        }
        Some(result)
    }

    /// First module on a live object matching `pred`.
    fn module_handle(&self, id: ObjectId, pred: impl Fn(&Module) -> bool) -> Option<ModuleHandle> {
        let slot = self.objects.find(id)?.find_module_slot(pred)?;
        Some(ModuleHandle::new(id, slot))
    }

    fn module_count(&self, id: ObjectId) -> u16 {
        self.objects.find_any(id).map_or(0, |e| e.modules.len() as u16)
    }

    /// Advance one frame.
    pub fn tick(&mut self) {
        let now = self.frame;
        physics::step(self);

        while let Some(handle) = self.scheduler.pop_due(now) {
            self.run_update(handle, now);
        }
        self.drain_pending_damage();

        for entity in self.objects.remove_destroyed() {
            self.scheduler.remove_entity(&entity);
            trace!(frame = now, object = %entity.id, "object removed");
        }
        self.frame = now + 1;
    }

    /// Advance `frames` frames.
    pub fn run(&mut self, frames: u32) {
        for _ in 0..frames {
            self.tick();
        }
    }

    fn run_update(&mut self, handle: ModuleHandle, now: Frame) {
        match self
            .objects
            .find_mut(handle.object)
            .and_then(|e| e.modules.get_mut(usize::from(handle.slot)))
        {
            Some(slot) => slot.wake_frame = FOREVER,
            None => return,
        }
        let sleep = self
            .with_module(handle, |m, sim| m.as_update().map(|u| u.update(sim, handle)))
            .flatten();
        if let Some(sleep) = sleep {
            self.set_wake(handle, sleep.wake_frame(now));
        }
    }

    /// Upgrades held by an object: its own plus its team's.
    #[must_use]
    pub fn held_upgrades(&self, id: ObjectId) -> UpgradeMask {
        let Some(entity) = self.objects.find_any(id) else {
            return UpgradeMask::NONE;
        };
        let team = entity
            .team
            .and_then(|t| self.team_upgrades.get(&t).copied())
            .unwrap_or(UpgradeMask::NONE);
        entity.upgrades.union(team)
    }

    #[must_use]
    pub fn team_upgrades(&self, team: TeamId) -> UpgradeMask {
        self.team_upgrades.get(&team).copied().unwrap_or(UpgradeMask::NONE)
    }

    /// Grant an upgrade to one object and notify its upgrade modules.
    pub fn give_upgrade(&mut self, id: ObjectId, upgrade: &str) -> Result<(), ConfigError> {
        let mask = self.data.upgrades.mask_of(upgrade)?;
        let Some(entity) = self.objects.find_mut(id) else {
            warn!(object = %id, upgrade, "upgrade granted to missing object");
            return Ok(());
        };
        entity.upgrades.insert(mask);
        debug!(frame = self.frame, object = %id, upgrade, "object upgrade granted");
        self.notify_upgrades(id);
        Ok(())
    }

    /// Grant an upgrade to a team and notify every live member.
    pub fn give_team_upgrade(&mut self, team: TeamId, upgrade: &str) -> Result<(), ConfigError> {
        let mask = self.data.upgrades.mask_of(upgrade)?;
        let held = self.team_upgrades(team).union(mask);
        self.team_upgrades.insert(team, held);
        debug!(frame = self.frame, %team, upgrade, "team upgrade granted");

        let members: Vec<ObjectId> = self.objects.iter().filter(|e| e.team == Some(team)).map(|e| e.id).collect();
        for id in members {
            self.notify_upgrades(id);
        }
        Ok(())
    }

    fn notify_upgrades(&mut self, id: ObjectId) {
        let held = self.held_upgrades(id);
        for slot in 0..self.module_count(id) {
            let handle = ModuleHandle::new(id, slot);
            self.with_module(handle, |m, sim| {
                if let Some(u) = m.as_upgrade() {
                    u.on_upgrade(sim, handle, held);
                }
            });
        }
    }

    /// Ask `transport`'s dock to take in `docker`.
    pub fn dock(&mut self, transport: ObjectId, docker: ObjectId) -> bool {
        let Some(handle) = self.module_handle(transport, |m| matches!(m, Module::RailedTransportDock(_))) else {
            return false;
        };
        self.with_module(handle, |m, sim| m.as_dock().map(|d| d.dock_action(sim, handle, docker)))
            .flatten()
            .unwrap_or(false)
    }

    /// Push every contained object out of `transport`'s dock.
    pub fn unload_all(&mut self, transport: ObjectId) -> bool {
        let Some(handle) = self.module_handle(transport, |m| matches!(m, Module::RailedTransportDock(_))) else {
            return false;
        };
        self.with_module(handle, |m, sim| m.as_dock().map(|d| d.unload_all(sim, handle)))
            .flatten()
            .is_some()
    }

    /// Push one more contained object out of `transport`'s dock.
    pub fn unload_single(&mut self, transport: ObjectId) -> bool {
        let Some(handle) = self.module_handle(transport, |m| matches!(m, Module::RailedTransportDock(_))) else {
            return false;
        };
        self.with_module(handle, |m, sim| m.as_dock().map(|d| d.unload_single(sim, handle)))
            .flatten()
            .is_some()
    }

    /// Bind `slave` to follow `master`.
    pub fn enslave(&mut self, slave: ObjectId, master: ObjectId) -> bool {
        let Some(handle) = self.module_handle(slave, |m| matches!(m, Module::MobMemberSlaved(_))) else {
            return false;
        };
        self.with_module(handle, |m, sim| m.as_slaved().map(|s| s.set_master(sim, handle, master)))
            .flatten()
            .is_some()
    }

    /// Point every minefield module on `id` at `target`, or back at the owner.
    pub fn set_minefield_target(&mut self, id: ObjectId, target: Option<Coord3>) -> bool {
        let Some(entity) = self.objects.find_mut(id) else {
            return false;
        };
        let mut any = false;
        for slot in &mut entity.modules {
            if let Some(minefield) = slot.module.as_mut().and_then(Module::as_minefield_mut) {
                minefield.set_target(target);
                any = true;
            }
        }
        any
    }

    /// Lay mines from every minefield module on `id`. Returns how many were placed.
    pub fn generate_minefield(&mut self, id: ObjectId) -> usize {
        let mut placed = 0;
        for slot in 0..self.module_count(id) {
            let handle = ModuleHandle::new(id, slot);
            placed += self
                .with_module(handle, |m, sim| m.as_minefield_mut().map_or(0, |g| g.place_mines(sim, handle)))
                .unwrap_or(0);
        }
        placed
    }
}
