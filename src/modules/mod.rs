//! Behavior modules.
//!
//! Every object carries an ordered list of modules built from its
//! template's [`ModuleData`]. A module is a small state machine that reacts
//! to some subset of events: a scheduler update, damage, death, an upgrade,
//! a collision, docking, or being enslaved to a master.
//!
//! ## Dispatch
//!
//! The set of behaviors is closed, so modules are a single [`Module`] enum.
//! Each behavior implements only the capability traits it needs, and the
//! enum exposes them through `as_update`, `as_die`, `as_damage`,
//! `as_upgrade`, `as_collide`, `as_dock` and `as_slaved`.
//!
//! ## Ownership while running
//!
//! A module is taken out of its slot while one of its callbacks runs and
//! put back afterwards, so a callback receives `&mut Simulation` and can
//! mutate any object, including its own, without aliasing itself. Other
//! objects are always referred to by [`ObjectId`] and re-resolved on use.
//!
//! ## Persistence
//!
//! Each module transfers its own state through [`Xfer`] with a per-module
//! version. Module data is never saved; it is rebuilt from the template.

pub mod destroy_die;
pub mod fire_weapon_when_damaged;
pub mod fire_weapon_when_dead;
pub mod generate_minefield;
pub mod instant_death;
pub mod mob_member_slaved;
pub mod railed_transport_dock;
pub mod slow_death;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use destroy_die::{DestroyDieBehavior, DestroyDieData};
pub use fire_weapon_when_damaged::{FireWeaponWhenDamagedBehavior, FireWeaponWhenDamagedData, TierWeapons};
pub use fire_weapon_when_dead::{FireWeaponWhenDeadBehavior, FireWeaponWhenDeadData};
pub use generate_minefield::{GenerateMinefieldBehavior, GenerateMinefieldData};
pub use instant_death::{InstantDeathBehavior, InstantDeathData};
pub use mob_member_slaved::{MobMemberSlavedData, MobMemberSlavedUpdate};
pub use railed_transport_dock::{RailedTransportDockData, RailedTransportDockUpdate};
pub use slow_death::{SlowDeathBehavior, SlowDeathData, SlowDeathPhase, SlowDeathPhaseData};

use crate::core::{
    ConfigError, Coord3, DeathType, DieMuxData, ObjectId, StatusFlags, UpdateSleep, UpgradeMask, UpgradeToggle,
    XferError,
};
use crate::sim::{DamageInfo, GameData, Simulation};
use crate::xfer::Xfer;

/// Address of one module: its object and slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle {
    pub object: ObjectId,
    pub slot: u16,
}

impl ModuleHandle {
    #[must_use]
    pub const fn new(object: ObjectId, slot: u16) -> Self {
        Self { object, slot }
    }
}

/// Driven by the frame scheduler.
pub trait UpdateModule {
    /// Run one step and say when to run next.
    fn update(&mut self, sim: &mut Simulation, this: ModuleHandle) -> UpdateSleep;
}

/// Notified when the owning object dies.
pub trait DieModule {
    fn on_die(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo);
}

/// Notified after damage has been applied to the owning object.
pub trait DamageModule {
    fn on_damage(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo);
}

/// Notified when the owner or its team gains an upgrade.
pub trait UpgradeModule {
    /// `held` is the union of the object's and its team's upgrades.
    fn on_upgrade(&mut self, sim: &mut Simulation, this: ModuleHandle, held: UpgradeMask);
}

/// Notified of physical contact. `other` is `None` for the ground.
pub trait CollideModule {
    fn on_collide(&mut self, sim: &mut Simulation, this: ModuleHandle, other: Option<ObjectId>, at: Coord3);
}

/// A dock that other objects can enter and leave.
pub trait DockModule {
    /// Called when `docker` reaches the dock. Returns false if the dock refuses it.
    fn dock_action(&mut self, sim: &mut Simulation, this: ModuleHandle, docker: ObjectId) -> bool;
    fn unload_all(&mut self, sim: &mut Simulation, this: ModuleHandle);
    fn unload_single(&mut self, sim: &mut Simulation, this: ModuleHandle);
}

/// Follows a master object.
pub trait SlavedModule {
    fn set_master(&mut self, sim: &mut Simulation, this: ModuleHandle, master: ObjectId);
    fn master(&self) -> ObjectId;
}

/// Declarative module configuration, one entry per template module.
///
/// Tagged by `module` in serialized form:
///
/// ```
/// use rts_behaviors::modules::ModuleData;
///
/// let data: ModuleData = serde_json::from_str(
///     r#"{ "module": "FireWeaponWhenDead", "weapon": "DeathBlast" }"#,
/// ).unwrap();
/// assert_eq!(data.kind_name(), "FireWeaponWhenDeadBehavior");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "module")]
pub enum ModuleData {
    SlowDeath(Arc<SlowDeathData>),
    FireWeaponWhenDamaged(Arc<FireWeaponWhenDamagedData>),
    FireWeaponWhenDead(Arc<FireWeaponWhenDeadData>),
    InstantDeath(Arc<InstantDeathData>),
    DestroyDie(Arc<DestroyDieData>),
    GenerateMinefield(Arc<GenerateMinefieldData>),
    RailedTransportDock(Arc<RailedTransportDockData>),
    MobMemberSlaved(Arc<MobMemberSlavedData>),
}

impl ModuleData {
    /// Name of the behavior this data builds, as stored in save games.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            ModuleData::SlowDeath(_) => SlowDeathBehavior::KIND,
            ModuleData::FireWeaponWhenDamaged(_) => FireWeaponWhenDamagedBehavior::KIND,
            ModuleData::FireWeaponWhenDead(_) => FireWeaponWhenDeadBehavior::KIND,
            ModuleData::InstantDeath(_) => InstantDeathBehavior::KIND,
            ModuleData::DestroyDie(_) => DestroyDieBehavior::KIND,
            ModuleData::GenerateMinefield(_) => GenerateMinefieldBehavior::KIND,
            ModuleData::RailedTransportDock(_) => RailedTransportDockUpdate::KIND,
            ModuleData::MobMemberSlaved(_) => MobMemberSlavedUpdate::KIND,
        }
    }

    /// Whether this module takes the object out of the world on a death of
    /// type `death`. Status filters are not considered.
    #[must_use]
    pub fn removes_on_death(&self, death: DeathType) -> bool {
        match self {
            ModuleData::SlowDeath(d) => d.die.death_types.contains(death),
            ModuleData::InstantDeath(d) => d.die.death_types.contains(death),
            ModuleData::DestroyDie(d) => d.die.death_types.contains(death),
            _ => false,
        }
    }

    /// Check every name this data refers to.
    pub fn validate(&self, game: &GameData) -> Result<(), ConfigError> {
        match self {
            ModuleData::SlowDeath(d) => d.validate(game),
            ModuleData::FireWeaponWhenDamaged(d) => d.validate(game),
            ModuleData::FireWeaponWhenDead(d) => d.validate(game),
            ModuleData::InstantDeath(d) => d.validate(game),
            ModuleData::DestroyDie(_) => Ok(()),
            ModuleData::GenerateMinefield(d) => d.validate(game),
            ModuleData::RailedTransportDock(d) => d.validate(),
            ModuleData::MobMemberSlaved(d) => d.validate(),
        }
    }
}

macro_rules! module_data_from {
    ($($data:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$data> for ModuleData {
                fn from(data: $data) -> Self {
                    ModuleData::$variant(Arc::new(data))
                }
            }
        )*
    };
}

module_data_from! {
    SlowDeathData => SlowDeath,
    FireWeaponWhenDamagedData => FireWeaponWhenDamaged,
    FireWeaponWhenDeadData => FireWeaponWhenDead,
    InstantDeathData => InstantDeath,
    DestroyDieData => DestroyDie,
    GenerateMinefieldData => GenerateMinefield,
    RailedTransportDockData => RailedTransportDock,
    MobMemberSlavedData => MobMemberSlaved,
}

/// A behavior module instance.
#[derive(Clone, Debug)]
pub enum Module {
    SlowDeath(SlowDeathBehavior),
    FireWeaponWhenDamaged(FireWeaponWhenDamagedBehavior),
    FireWeaponWhenDead(FireWeaponWhenDeadBehavior),
    InstantDeath(InstantDeathBehavior),
    DestroyDie(DestroyDieBehavior),
    GenerateMinefield(GenerateMinefieldBehavior),
    RailedTransportDock(RailedTransportDockUpdate),
    MobMemberSlaved(MobMemberSlavedUpdate),
}

impl Module {
    /// Build a module from its data, resolving weapons and upgrades.
    pub fn new(data: &ModuleData, game: &GameData) -> Result<Self, ConfigError> {
        Ok(match data {
            ModuleData::SlowDeath(d) => Module::SlowDeath(SlowDeathBehavior::new(Arc::clone(d))?),
            ModuleData::FireWeaponWhenDamaged(d) => {
                Module::FireWeaponWhenDamaged(FireWeaponWhenDamagedBehavior::new(Arc::clone(d), game)?)
            }
            ModuleData::FireWeaponWhenDead(d) => {
                Module::FireWeaponWhenDead(FireWeaponWhenDeadBehavior::new(Arc::clone(d), game)?)
            }
            ModuleData::InstantDeath(d) => Module::InstantDeath(InstantDeathBehavior::new(Arc::clone(d), game)?),
            ModuleData::DestroyDie(d) => Module::DestroyDie(DestroyDieBehavior::new(Arc::clone(d))),
            ModuleData::GenerateMinefield(d) => {
                Module::GenerateMinefield(GenerateMinefieldBehavior::new(Arc::clone(d), game)?)
            }
            ModuleData::RailedTransportDock(d) => {
                Module::RailedTransportDock(RailedTransportDockUpdate::new(Arc::clone(d)))
            }
            ModuleData::MobMemberSlaved(d) => Module::MobMemberSlaved(MobMemberSlavedUpdate::new(Arc::clone(d))),
        })
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Module::SlowDeath(_) => SlowDeathBehavior::KIND,
            Module::FireWeaponWhenDamaged(_) => FireWeaponWhenDamagedBehavior::KIND,
            Module::FireWeaponWhenDead(_) => FireWeaponWhenDeadBehavior::KIND,
            Module::InstantDeath(_) => InstantDeathBehavior::KIND,
            Module::DestroyDie(_) => DestroyDieBehavior::KIND,
            Module::GenerateMinefield(_) => GenerateMinefieldBehavior::KIND,
            Module::RailedTransportDock(_) => RailedTransportDockUpdate::KIND,
            Module::MobMemberSlaved(_) => MobMemberSlavedUpdate::KIND,
        }
    }

    /// Should the scheduler run this module on the frame it is created?
    #[must_use]
    pub fn wakes_on_creation(&self) -> bool {
        match self {
            Module::FireWeaponWhenDamaged(m) => m.wakes_on_creation(),
            Module::GenerateMinefield(m) => m.wakes_on_creation(),
            Module::MobMemberSlaved(_) => true,
            _ => false,
        }
    }

    pub fn as_update(&mut self) -> Option<&mut dyn UpdateModule> {
        match self {
            Module::SlowDeath(m) => Some(m),
            Module::FireWeaponWhenDamaged(m) => Some(m),
            Module::GenerateMinefield(m) => Some(m),
            Module::RailedTransportDock(m) => Some(m),
            Module::MobMemberSlaved(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_die(&mut self) -> Option<&mut dyn DieModule> {
        match self {
            Module::SlowDeath(m) => Some(m),
            Module::FireWeaponWhenDead(m) => Some(m),
            Module::InstantDeath(m) => Some(m),
            Module::DestroyDie(m) => Some(m),
            Module::GenerateMinefield(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_damage(&mut self) -> Option<&mut dyn DamageModule> {
        match self {
            Module::FireWeaponWhenDamaged(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_upgrade(&mut self) -> Option<&mut dyn UpgradeModule> {
        match self {
            Module::FireWeaponWhenDamaged(m) => Some(m),
            Module::FireWeaponWhenDead(m) => Some(m),
            Module::InstantDeath(m) => Some(m),
            Module::GenerateMinefield(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_collide(&mut self) -> Option<&mut dyn CollideModule> {
        match self {
            Module::SlowDeath(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_dock(&mut self) -> Option<&mut dyn DockModule> {
        match self {
            Module::RailedTransportDock(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_slaved(&mut self) -> Option<&mut dyn SlavedModule> {
        match self {
            Module::MobMemberSlaved(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_slow_death(&self) -> Option<&SlowDeathBehavior> {
        match self {
            Module::SlowDeath(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_slow_death_mut(&mut self) -> Option<&mut SlowDeathBehavior> {
        match self {
            Module::SlowDeath(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_minefield(&self) -> Option<&GenerateMinefieldBehavior> {
        match self {
            Module::GenerateMinefield(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_minefield_mut(&mut self) -> Option<&mut GenerateMinefieldBehavior> {
        match self {
            Module::GenerateMinefield(m) => Some(m),
            _ => None,
        }
    }

    /// Transfer this module's state.
    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        match self {
            Module::SlowDeath(m) => m.xfer(xfer),
            Module::FireWeaponWhenDamaged(m) => m.xfer(xfer),
            Module::FireWeaponWhenDead(m) => m.xfer(xfer),
            Module::InstantDeath(m) => m.xfer(xfer),
            Module::DestroyDie(m) => m.xfer(xfer),
            Module::GenerateMinefield(m) => m.xfer(xfer),
            Module::RailedTransportDock(m) => m.xfer(xfer),
            Module::MobMemberSlaved(m) => m.xfer(xfer),
        }
    }

    /// Fold this module's state into a checksum.
    pub fn crc(&self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        self.clone().xfer(xfer)
    }

    /// Fix up id references once every object has been loaded.
    ///
    /// Returns a wake directive when the module wants to run sooner than
    /// its saved wake frame.
    pub fn load_post_process(&mut self, sim: &Simulation, this: ModuleHandle) -> Option<UpdateSleep> {
        match self {
            Module::GenerateMinefield(m) => {
                m.load_post_process(sim);
                None
            }
            Module::RailedTransportDock(m) => {
                m.load_post_process(sim);
                None
            }
            Module::MobMemberSlaved(m) => m.load_post_process(sim, this),
            _ => None,
        }
    }
}

/// Shared gate for death-triggered toggles.
///
/// The owner must not be under construction, the death must pass the die
/// filter, and the toggle must be on without a conflicting upgrade held by
/// the owner or its team.
pub(crate) fn death_gates_pass(
    sim: &Simulation,
    this: ModuleHandle,
    toggle: &UpgradeToggle,
    die: &DieMuxData,
    damage: &DamageInfo,
) -> bool {
    let Some(entity) = sim.find_any(this.object) else {
        return false;
    };
    if entity.status.contains(StatusFlags::UNDER_CONSTRUCTION) {
        return false;
    }
    if !die.is_die_applicable(entity.status, damage.death_type) {
        return false;
    }
    toggle.is_active(sim.held_upgrades(this.object))
}

/// Trigger one random fx, one random creation list and one random weapon.
///
/// Each list is sampled independently with a uniform index, in that order;
/// an empty list is skipped without consuming a random draw.
pub(crate) fn do_one_of_each(
    sim: &mut Simulation,
    object: ObjectId,
    fx: &[String],
    ocls: &[String],
    weapons: &[String],
) {
    if let Some(i) = sim.rng_mut().random_index(fx.len()) {
        sim.do_fx(&fx[i], object);
    }
    if let Some(i) = sim.rng_mut().random_index(ocls.len()) {
        sim.create_from_ocl(&ocls[i], object);
    }
    if let Some(i) = sim.rng_mut().random_index(weapons.len()) {
        if let Some(pos) = sim.find_any(object).map(|e| e.position) {
            sim.fire_temporary_weapon(&weapons[i], object, pos);
        }
    }
}

/// Validate lists of fx, creation list and weapon names.
pub(crate) fn validate_effect_lists(
    game: &GameData,
    fx: &[String],
    ocls: &[String],
    weapons: &[String],
) -> Result<(), ConfigError> {
    for name in fx {
        game.effects.require_fx(name)?;
    }
    for name in ocls {
        game.effects.require_ocl(name)?;
    }
    for name in weapons {
        game.weapons.require(name)?;
    }
    Ok(())
}
