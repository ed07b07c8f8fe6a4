//! Fire reaction weapons when hit, and continuous weapons while upgraded.
//!
//! Both kinds come in four variants, one per body damage tier, and any
//! variant may be left unconfigured. Weapons are allocated once, with full
//! clips, when the module is built.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{DamageModule, ModuleHandle, UpdateModule, UpgradeModule};
use crate::core::{
    BodyDamageType, ConfigError, DamageTypeMask, UpdateSleep, UpgradeMask, UpgradeMuxData, UpgradeToggle,
    XferError,
};
use crate::services::{xfer_weapon_slot, Weapon};
use crate::sim::{DamageInfo, GameData, Simulation};
use crate::xfer::Xfer;

/// One optional weapon name per body damage tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeapons {
    pub pristine: Option<String>,
    pub damaged: Option<String>,
    pub really_damaged: Option<String>,
    pub rubble: Option<String>,
}

impl TierWeapons {
    /// The same weapon in every tier.
    #[must_use]
    pub fn all(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            pristine: Some(name.clone()),
            damaged: Some(name.clone()),
            really_damaged: Some(name.clone()),
            rubble: Some(name),
        }
    }

    fn names(&self) -> [Option<&str>; BodyDamageType::COUNT] {
        [
            self.pristine.as_deref(),
            self.damaged.as_deref(),
            self.really_damaged.as_deref(),
            self.rubble.as_deref(),
        ]
    }

    fn allocate(&self, game: &GameData) -> Result<[Option<Weapon>; BodyDamageType::COUNT], ConfigError> {
        let mut out: [Option<Weapon>; BodyDamageType::COUNT] = Default::default();
        for (slot, name) in out.iter_mut().zip(self.names()) {
            if let Some(name) = name {
                *slot = Some(game.weapons.allocate(name)?);
            }
        }
        Ok(out)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireWeaponWhenDamagedData {
    pub upgrade: UpgradeMuxData,
    /// Damage types that can provoke a reaction.
    pub damage_types: DamageTypeMask,
    /// Minimum damage actually dealt by one hit to provoke a reaction.
    pub damage_amount: f32,
    pub reaction: TierWeapons,
    pub continuous: TierWeapons,
}

impl Default for FireWeaponWhenDamagedData {
    fn default() -> Self {
        Self {
            upgrade: UpgradeMuxData::always_active(),
            damage_types: DamageTypeMask::ALL,
            damage_amount: 0.0,
            reaction: TierWeapons::default(),
            continuous: TierWeapons::default(),
        }
    }
}

impl FireWeaponWhenDamagedData {
    pub fn validate(&self, game: &GameData) -> Result<(), ConfigError> {
        for name in self.reaction.names().into_iter().chain(self.continuous.names()).flatten() {
            game.weapons.require(name)?;
        }
        if self.damage_amount < 0.0 {
            return Err(ConfigError::InvalidValue {
                module: FireWeaponWhenDamagedBehavior::KIND,
                field: "damage_amount",
                reason: format!("must not be negative, got {}", self.damage_amount),
            });
        }
        self.upgrade.resolve(&game.upgrades)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct FireWeaponWhenDamagedBehavior {
    data: Arc<FireWeaponWhenDamagedData>,
    toggle: UpgradeToggle,
    reaction: [Option<Weapon>; BodyDamageType::COUNT],
    continuous: [Option<Weapon>; BodyDamageType::COUNT],
}

impl FireWeaponWhenDamagedBehavior {
    pub const KIND: &'static str = "FireWeaponWhenDamagedBehavior";

    pub fn new(data: Arc<FireWeaponWhenDamagedData>, game: &GameData) -> Result<Self, ConfigError> {
        let toggle = UpgradeToggle::new(data.upgrade.resolve(&game.upgrades)?);
        let reaction = data.reaction.allocate(game)?;
        let continuous = data.continuous.allocate(game)?;
        Ok(Self {
            data,
            toggle,
            reaction,
            continuous,
        })
    }

    pub(crate) fn wakes_on_creation(&self) -> bool {
        self.toggle.is_executed() && self.has_continuous()
    }

    fn has_continuous(&self) -> bool {
        self.continuous.iter().any(Option::is_some)
    }

    #[must_use]
    pub fn reaction_weapon(&self, tier: BodyDamageType) -> Option<&Weapon> {
        self.reaction[tier.index()].as_ref()
    }

    #[must_use]
    pub fn continuous_weapon(&self, tier: BodyDamageType) -> Option<&Weapon> {
        self.continuous[tier.index()].as_ref()
    }

    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = 1;
        xfer.xfer_version(&mut version, 1, Self::KIND)?;
        let mut executed = self.toggle.is_executed();
        xfer.xfer_bool(&mut executed)?;
        self.toggle.set_executed(executed);
        for slot in self.reaction.iter_mut().chain(self.continuous.iter_mut()) {
            xfer_weapon_slot(xfer, slot)?;
        }
        Ok(())
    }
}

impl DamageModule for FireWeaponWhenDamagedBehavior {
    fn on_damage(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo) {
        if !self.toggle.is_active(sim.held_upgrades(this.object)) {
            return;
        }
        if !self.data.damage_types.contains(damage.damage_type) {
            return;
        }
        if damage.actual_dealt < self.data.damage_amount {
            trace!(object = %this.object, dealt = damage.actual_dealt, "hit below reaction threshold");
            return;
        }
        let Some((tier, pos)) = sim.find_any(this.object).map(|e| (e.body.damage_state, e.position)) else {
            return;
        };
        let now = sim.frame();
        if let Some(weapon) = self.reaction[tier.index()].as_mut() {
            if weapon.is_ready(now) {
                sim.fire_weapon(weapon, this.object, pos);
            }
        }
    }
}

impl UpdateModule for FireWeaponWhenDamagedBehavior {
    fn update(&mut self, sim: &mut Simulation, this: ModuleHandle) -> UpdateSleep {
        if !self.toggle.is_active(sim.held_upgrades(this.object)) || !self.has_continuous() {
            return UpdateSleep::Forever;
        }
        let Some((tier, pos)) = sim.find(this.object).map(|e| (e.body.damage_state, e.position)) else {
            return UpdateSleep::Forever;
        };
        let now = sim.frame();
        if let Some(weapon) = self.continuous[tier.index()].as_mut() {
            if weapon.is_ready(now) {
                sim.fire_weapon(weapon, this.object, pos);
            }
        }
        UpdateSleep::NextFrame
    }
}

impl UpgradeModule for FireWeaponWhenDamagedBehavior {
    fn on_upgrade(&mut self, sim: &mut Simulation, this: ModuleHandle, held: UpgradeMask) {
        if self.toggle.try_trigger(held) {
            sim.wake_module(this);
        }
    }
}
