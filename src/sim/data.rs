//! Game data: every immutable store a simulation reads from.
//!
//! `GameData` is assembled with infallible `with_*` builders and checked
//! once by [`GameData::validate`], which `Simulation::new` calls. Every
//! cross-reference (module → weapon, fx, OCL, template, upgrade; OCL →
//! template) is resolved there so bad content fails at load, not mid-game.

use crate::core::{ConfigError, DeathType, UpgradeCenter};
use crate::modules::{MobMemberSlavedUpdate, ModuleData};
use crate::services::{EffectStore, ObjectCreationList, WeaponStore, WeaponTemplate};
use crate::world::{TemplateStore, ThingTemplate};

#[derive(Clone, Debug, Default)]
pub struct GameData {
    pub templates: TemplateStore,
    pub weapons: WeaponStore,
    pub effects: EffectStore,
    pub upgrades: UpgradeCenter,
    deferred: Vec<ConfigError>,
}

impl GameData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_template(mut self, template: ThingTemplate) -> Self {
        if let Err(err) = self.templates.register(template) {
            self.deferred.push(err);
        }
        self
    }

    #[must_use]
    pub fn with_weapon(mut self, weapon: WeaponTemplate) -> Self {
        self.weapons.register(weapon);
        self
    }

    #[must_use]
    pub fn with_fx(mut self, name: impl Into<String>) -> Self {
        self.effects.register_fx(name);
        self
    }

    #[must_use]
    pub fn with_ocl(mut self, ocl: ObjectCreationList) -> Self {
        self.effects.register_ocl(ocl);
        self
    }

    #[must_use]
    pub fn with_upgrade(mut self, name: impl Into<String>) -> Self {
        if let Err(err) = self.upgrades.register(name) {
            self.deferred.push(err);
        }
        self
    }

    /// Check registration errors and every cross-reference.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(err) = self.deferred.first() {
            return Err(err.clone());
        }
        for ocl in self.effects.ocls_sorted() {
            for entry in &ocl.entries {
                self.templates.require(&entry.template)?;
            }
        }
        for template in self.templates.iter_sorted() {
            for module in &template.modules {
                module.validate(self)?;
            }
            // a slave whose master is gone is killed and must not linger as a corpse
            let slaved = template.modules.iter().any(|m| matches!(m, ModuleData::MobMemberSlaved(_)));
            if slaved && !template.modules.iter().any(|m| m.removes_on_death(DeathType::Normal)) {
                return Err(ConfigError::InvalidValue {
                    module: MobMemberSlavedUpdate::KIND,
                    field: "template",
                    reason: format!("'{}' has no die module that removes it on a normal death", template.name),
                });
            }
        }
        Ok(())
    }
}
