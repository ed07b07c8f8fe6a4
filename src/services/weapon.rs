//! Weapon templates and stateful weapon instances.
//!
//! A `WeaponTemplate` describes the damage a shot does and its firing
//! cadence. A `Weapon` is one module's instance of a template, tracking
//! its clip and the frame it may fire again. Damage delivery is the
//! simulation's job; see `Simulation::fire_weapon`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{ConfigError, DamageType, DeathType, Frame, XferError};
use crate::xfer::Xfer;

/// Immutable description of a weapon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponTemplate {
    pub name: String,

    /// Damage dealt to every object within `primary_radius` of the target.
    pub primary_damage: f32,

    #[serde(default)]
    pub primary_radius: f32,

    #[serde(default = "default_damage_type")]
    pub damage_type: DamageType,

    #[serde(default = "default_death_type")]
    pub death_type: DeathType,

    /// Shots per clip; 0 means the clip never empties.
    #[serde(default)]
    pub clip_size: u32,

    #[serde(default)]
    pub delay_between_shots: Frame,

    #[serde(default)]
    pub clip_reload_time: Frame,

    /// Whether the firing object can be hit by its own shot.
    #[serde(default)]
    pub affects_self: bool,
}

fn default_damage_type() -> DamageType {
    DamageType::Explosion
}

fn default_death_type() -> DeathType {
    DeathType::Exploded
}

impl WeaponTemplate {
    /// A single-target weapon with no reload constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, primary_damage: f32) -> Self {
        Self {
            name: name.into(),
            primary_damage,
            primary_radius: 0.0,
            damage_type: default_damage_type(),
            death_type: default_death_type(),
            clip_size: 0,
            delay_between_shots: 0,
            clip_reload_time: 0,
            affects_self: false,
        }
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.primary_radius = radius;
        self
    }

    #[must_use]
    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    #[must_use]
    pub fn with_death_type(mut self, death_type: DeathType) -> Self {
        self.death_type = death_type;
        self
    }

    /// Clip of `clip_size` shots, `delay` frames apart, `reload` frames to refill.
    #[must_use]
    pub fn with_clip(mut self, clip_size: u32, delay: Frame, reload: Frame) -> Self {
        self.clip_size = clip_size;
        self.delay_between_shots = delay;
        self.clip_reload_time = reload;
        self
    }

    #[must_use]
    pub fn with_affects_self(mut self, affects_self: bool) -> Self {
        self.affects_self = affects_self;
        self
    }
}

/// Registry of weapon templates, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct WeaponStore {
    weapons: FxHashMap<String, Arc<WeaponTemplate>>,
}

impl WeaponStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one with that name.
    pub fn register(&mut self, weapon: WeaponTemplate) {
        self.weapons.insert(weapon.name.clone(), Arc::new(weapon));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<WeaponTemplate>> {
        self.weapons.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Arc<WeaponTemplate>, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownWeapon(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.weapons.contains_key(name)
    }

    /// Build a loaded instance of the named weapon.
    pub fn allocate(&self, name: &str) -> Result<Weapon, ConfigError> {
        Ok(Weapon::new(Arc::clone(self.require(name)?)))
    }
}

/// A weapon owned by a module.
#[derive(Clone, Debug, PartialEq)]
pub struct Weapon {
    template: Arc<WeaponTemplate>,
    ammo_in_clip: u32,
    next_shot_frame: Frame,
}

impl Weapon {
    /// A weapon with a full clip, ready immediately.
    #[must_use]
    pub fn new(template: Arc<WeaponTemplate>) -> Self {
        Self {
            ammo_in_clip: template.clip_size,
            next_shot_frame: 0,
            template,
        }
    }

    #[must_use]
    pub fn template(&self) -> &Arc<WeaponTemplate> {
        &self.template
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.name
    }

    #[must_use]
    pub fn ammo_in_clip(&self) -> u32 {
        self.ammo_in_clip
    }

    #[must_use]
    pub fn next_shot_frame(&self) -> Frame {
        self.next_shot_frame
    }

    /// Can this weapon fire on frame `now`?
    #[must_use]
    pub fn is_ready(&self, now: Frame) -> bool {
        now >= self.next_shot_frame
    }

    /// Spend one shot fired on `now`, scheduling the next one.
    pub fn record_shot(&mut self, now: Frame) {
        let t = &self.template;
        if t.clip_size == 0 {
            self.next_shot_frame = now + t.delay_between_shots;
            return;
        }
        self.ammo_in_clip = self.ammo_in_clip.saturating_sub(1);
        if self.ammo_in_clip == 0 {
            self.ammo_in_clip = t.clip_size;
            self.next_shot_frame = now + t.clip_reload_time.max(t.delay_between_shots);
        } else {
            self.next_shot_frame = now + t.delay_between_shots;
        }
    }

    /// Transfer clip and cadence. The template is rebuilt from module data.
    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = 1;
        xfer.xfer_version(&mut version, 1, "Weapon")?;
        xfer.xfer_u32(&mut self.ammo_in_clip)?;
        xfer.xfer_u32(&mut self.next_shot_frame)
    }
}

/// Transfer an optional weapon slot: a presence flag, then the weapon.
///
/// Presence is decided by module data, so a mismatch on load is corrupt data.
pub fn xfer_weapon_slot(xfer: &mut dyn Xfer, slot: &mut Option<Weapon>) -> Result<(), XferError> {
    let mut present = slot.is_some();
    xfer.xfer_bool(&mut present)?;
    match (present, slot.as_mut()) {
        (true, Some(weapon)) => weapon.xfer(xfer),
        (false, None) => Ok(()),
        _ => Err(XferError::InvalidData("weapon slot presence differs from module data".into())),
    }
}
