//! Fire a weapon at the object's own position when it dies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{death_gates_pass, DieModule, ModuleHandle, UpgradeModule};
use crate::core::{ConfigError, DieMuxData, UpgradeMask, UpgradeMuxData, UpgradeToggle, XferError};
use crate::sim::{DamageInfo, GameData, Simulation};
use crate::xfer::Xfer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FireWeaponWhenDeadData {
    pub weapon: String,
    #[serde(default = "UpgradeMuxData::always_active")]
    pub upgrade: UpgradeMuxData,
    #[serde(default)]
    pub die: DieMuxData,
}

impl FireWeaponWhenDeadData {
    /// Always-active death weapon.
    #[must_use]
    pub fn new(weapon: impl Into<String>) -> Self {
        Self {
            weapon: weapon.into(),
            upgrade: UpgradeMuxData::always_active(),
            die: DieMuxData::default(),
        }
    }

    #[must_use]
    pub fn with_upgrade(mut self, upgrade: UpgradeMuxData) -> Self {
        self.upgrade = upgrade;
        self
    }

    #[must_use]
    pub fn with_die(mut self, die: DieMuxData) -> Self {
        self.die = die;
        self
    }

    pub fn validate(&self, game: &GameData) -> Result<(), ConfigError> {
        game.weapons.require(&self.weapon)?;
        self.upgrade.resolve(&game.upgrades)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct FireWeaponWhenDeadBehavior {
    data: Arc<FireWeaponWhenDeadData>,
    toggle: UpgradeToggle,
}

impl FireWeaponWhenDeadBehavior {
    pub const KIND: &'static str = "FireWeaponWhenDeadBehavior";

    pub fn new(data: Arc<FireWeaponWhenDeadData>, game: &GameData) -> Result<Self, ConfigError> {
        game.weapons.require(&data.weapon)?;
        let toggle = UpgradeToggle::new(data.upgrade.resolve(&game.upgrades)?);
        Ok(Self { data, toggle })
    }

    #[must_use]
    pub fn is_active(&self, held: UpgradeMask) -> bool {
        self.toggle.is_active(held)
    }

    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = 1;
        xfer.xfer_version(&mut version, 1, Self::KIND)?;
        let mut executed = self.toggle.is_executed();
        xfer.xfer_bool(&mut executed)?;
        self.toggle.set_executed(executed);
        Ok(())
    }
}

impl DieModule for FireWeaponWhenDeadBehavior {
    fn on_die(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo) {
        if !death_gates_pass(sim, this, &self.toggle, &self.data.die, damage) {
            trace!(object = %this.object, "death weapon gated off");
            return;
        }
        if let Some(pos) = sim.find_any(this.object).map(|e| e.position) {
            sim.fire_temporary_weapon(&self.data.weapon, this.object, pos);
        }
    }
}

impl UpgradeModule for FireWeaponWhenDeadBehavior {
    fn on_upgrade(&mut self, _sim: &mut Simulation, _this: ModuleHandle, held: UpgradeMask) {
        self.toggle.try_trigger(held);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Coord3, DeathType, StatusFlags, TeamId};
    use crate::services::{EffectEvent, WeaponTemplate};
    use crate::world::ThingTemplate;
    use crate::SimConfig;

    fn sim_with(data: FireWeaponWhenDeadData) -> Simulation {
        let game = GameData::new()
            .with_upgrade("Demo")
            .with_upgrade("Disarm")
            .with_weapon(WeaponTemplate::new("DeathBlast", 10.0).with_radius(5.0))
            .with_template(ThingTemplate::new("Bomb").with_module(data));
        Simulation::new(SimConfig::default(), game).unwrap()
    }

    fn shots(sim: &Simulation) -> usize {
        sim.effects()
            .iter()
            .filter(|e| matches!(e, EffectEvent::WeaponFired { .. }))
            .count()
    }

    #[test]
    fn test_fires_on_death() {
        let mut sim = sim_with(FireWeaponWhenDeadData::new("DeathBlast"));
        let bomb = sim.create_object("Bomb", None, Coord3::new(3.0, 4.0, 0.0)).unwrap();
        sim.kill(bomb);
        assert_eq!(shots(&sim), 1);
    }

    #[test]
    fn test_under_construction_is_silent() {
        let mut sim = sim_with(FireWeaponWhenDeadData::new("DeathBlast"));
        let bomb = sim.create_object("Bomb", None, Coord3::zero()).unwrap();
        sim.find_mut(bomb).unwrap().status.insert(StatusFlags::UNDER_CONSTRUCTION);
        sim.kill(bomb);
        assert_eq!(shots(&sim), 0);
    }

    #[test]
    fn test_upgrade_gate_and_conflict() {
        let mut sim = sim_with(
            FireWeaponWhenDeadData::new("DeathBlast")
                .with_upgrade(UpgradeMuxData {
                    triggered_by: vec!["Demo".into()],
                    conflicts_with: vec!["Disarm".into()],
                    ..Default::default()
                })
                .with_die(DieMuxData::for_deaths(&[DeathType::Normal])),
        );
        let team = Some(TeamId(1));
        let a = sim.create_object("Bomb", team, Coord3::zero()).unwrap();
        let b = sim.create_object("Bomb", team, Coord3::zero()).unwrap();
        let c = sim.create_object("Bomb", team, Coord3::zero()).unwrap();

        sim.kill(a);
        assert_eq!(shots(&sim), 0, "toggle not yet triggered");

        sim.give_team_upgrade(TeamId(1), "Demo").unwrap();
        sim.kill_with(b, DeathType::Crushed);
        assert_eq!(shots(&sim), 0, "death type filtered");

        sim.give_team_upgrade(TeamId(1), "Disarm").unwrap();
        sim.kill(c);
        assert_eq!(shots(&sim), 0, "conflicting upgrade held by team");
    }
}
