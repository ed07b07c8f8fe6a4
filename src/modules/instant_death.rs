//! Die on the spot: one random fx, creation list and weapon, then destroy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{death_gates_pass, do_one_of_each, validate_effect_lists, DieModule, ModuleHandle, UpgradeModule};
use crate::core::{ConfigError, DieMuxData, UpgradeMask, UpgradeMuxData, UpgradeToggle, XferError};
use crate::sim::{DamageInfo, GameData, Simulation};
use crate::xfer::Xfer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantDeathData {
    pub fx: Vec<String>,
    pub ocls: Vec<String>,
    pub weapons: Vec<String>,
    pub upgrade: UpgradeMuxData,
    pub die: DieMuxData,
}

impl Default for InstantDeathData {
    fn default() -> Self {
        Self {
            fx: Vec::new(),
            ocls: Vec::new(),
            weapons: Vec::new(),
            upgrade: UpgradeMuxData::always_active(),
            die: DieMuxData::default(),
        }
    }
}

impl InstantDeathData {
    pub fn validate(&self, game: &GameData) -> Result<(), ConfigError> {
        validate_effect_lists(game, &self.fx, &self.ocls, &self.weapons)?;
        self.upgrade.resolve(&game.upgrades)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct InstantDeathBehavior {
    data: Arc<InstantDeathData>,
    toggle: UpgradeToggle,
}

impl InstantDeathBehavior {
    pub const KIND: &'static str = "InstantDeathBehavior";

    pub fn new(data: Arc<InstantDeathData>, game: &GameData) -> Result<Self, ConfigError> {
        let toggle = UpgradeToggle::new(data.upgrade.resolve(&game.upgrades)?);
        Ok(Self { data, toggle })
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

impl DieModule for InstantDeathBehavior {
    fn on_die(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo) {
        if !death_gates_pass(sim, this, &self.toggle, &self.data.die, damage) {
            return;
        }
        let d = &self.data;
        do_one_of_each(sim, this.object, &d.fx, &d.ocls, &d.weapons);
        sim.destroy_object(this.object);
    }
}

impl UpgradeModule for InstantDeathBehavior {
    fn on_upgrade(&mut self, _sim: &mut Simulation, _this: ModuleHandle, held: UpgradeMask) {
        self.toggle.try_trigger(held);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Coord3;
    use crate::services::{EffectEvent, ObjectCreationList, WeaponTemplate};
    use crate::world::ThingTemplate;
    use crate::SimConfig;

    #[test]
    fn test_one_of_each_then_destroy() {
        let game = GameData::new()
            .with_fx("FX_A")
            .with_fx("FX_B")
            .with_weapon(WeaponTemplate::new("Pop", 1.0))
            .with_template(ThingTemplate::new("Scrap"))
            .with_ocl(ObjectCreationList::new("OCL_Scrap").with_entry("Scrap", 2, 5.0))
            .with_template(ThingTemplate::new("Barrel").with_module(InstantDeathData {
                fx: vec!["FX_A".into(), "FX_B".into()],
                ocls: vec!["OCL_Scrap".into()],
                weapons: vec!["Pop".into()],
                ..Default::default()
            }));
        let mut sim = Simulation::new(SimConfig::default().with_seed(3), game).unwrap();
        let barrel = sim.create_object("Barrel", None, Coord3::zero()).unwrap();

        sim.kill(barrel);

        assert!(sim.find(barrel).is_none());
        let events = sim.effects();
        assert_eq!(events.iter().filter(|e| e.fx_name().is_some()).count(), 1);
        assert_eq!(
            events.iter().filter(|e| matches!(e, EffectEvent::ObjectCreated { .. })).count(),
            2
        );
        assert_eq!(events.iter().filter(|e| e.weapon_name() == Some("Pop")).count(), 1);
    }

    #[test]
    fn test_inactive_toggle_keeps_object() {
        let game = GameData::new()
            .with_upgrade("Volatile")
            .with_template(ThingTemplate::new("Barrel").with_module(InstantDeathData {
                upgrade: UpgradeMuxData::triggered_by("Volatile"),
                ..Default::default()
            }));
        let mut sim = Simulation::new(SimConfig::default(), game).unwrap();
        let barrel = sim.create_object("Barrel", None, Coord3::zero()).unwrap();
        sim.kill(barrel);
        assert!(sim.find(barrel).is_some());
    }
}
