//! Status bits, kind classification, damage and death taxonomies.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-object status bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StatusFlags: u32 {
        /// Logically destroyed; removed from the registry at end of tick.
        const DESTROYED = 1 << 0;
        /// Health reached zero; death handling has run.
        const EFFECTIVELY_DEAD = 1 << 1;
        const UNDER_CONSTRUCTION = 1 << 2;
        const UNSELECTABLE = 1 << 3;
        /// Held in place; locomotion and physics are suspended.
        const DISABLED_HELD = 1 << 4;
        /// Inside a container.
        const MASKED = 1 << 5;
        const IS_ATTACKING = 1 << 6;
        const NO_COLLISIONS = 1 << 7;
    }
}

bitflags! {
    /// Coarse type classification used by type queries.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KindOf: u32 {
        const INFANTRY = 1 << 0;
        const VEHICLE = 1 << 1;
        const STRUCTURE = 1 << 2;
        const AIRCRAFT = 1 << 3;
        const SHRUBBERY = 1 << 4;
        const MINE = 1 << 5;
        const PROJECTILE = 1 << 6;
        const TRANSPORT = 1 << 7;
    }
}

bitflags! {
    /// Visual state requests published for the presentation layer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ModelConditions: u32 {
        const DYING = 1 << 0;
        const FLAILING = 1 << 1;
        const BOUNCING = 1 << 2;
        const SINKING = 1 << 3;
        const MOVING = 1 << 4;
    }
}

/// Kind of damage carried by a damage request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DamageType {
    Explosion = 0,
    Crush,
    ArmorPiercing,
    SmallArms,
    Flame,
    Radiation,
    Poison,
    Laser,
    Sniper,
    Unresistable,
}

impl DamageType {
    pub const ALL: [DamageType; 10] = [
        DamageType::Explosion,
        DamageType::Crush,
        DamageType::ArmorPiercing,
        DamageType::SmallArms,
        DamageType::Flame,
        DamageType::Radiation,
        DamageType::Poison,
        DamageType::Laser,
        DamageType::Sniper,
        DamageType::Unresistable,
    ];

    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// Cause of death carried by a damage request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeathType {
    Normal = 0,
    Crushed,
    Burned,
    Exploded,
    Poisoned,
    Toppled,
    Lasered,
    Suicided,
    Detonated,
}

impl DeathType {
    pub const ALL: [DeathType; 9] = [
        DeathType::Normal,
        DeathType::Crushed,
        DeathType::Burned,
        DeathType::Exploded,
        DeathType::Poisoned,
        DeathType::Toppled,
        DeathType::Lasered,
        DeathType::Suicided,
        DeathType::Detonated,
    ];

    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

/// Set of damage types. Serialized as a list of names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<DamageType>", into = "Vec<DamageType>")]
pub struct DamageTypeMask(u32);

impl DamageTypeMask {
    pub const NONE: DamageTypeMask = DamageTypeMask(0);
    pub const ALL: DamageTypeMask = DamageTypeMask((1 << DamageType::ALL.len()) - 1);

    #[must_use]
    pub fn of(types: &[DamageType]) -> Self {
        Self(types.iter().fold(0, |acc, t| acc | (1 << *t as u32)))
    }

    #[must_use]
    pub fn contains(self, t: DamageType) -> bool {
        self.0 & (1 << t as u32) != 0
    }
}

impl Default for DamageTypeMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<Vec<DamageType>> for DamageTypeMask {
    fn from(types: Vec<DamageType>) -> Self {
        Self::of(&types)
    }
}

impl From<DamageTypeMask> for Vec<DamageType> {
    fn from(mask: DamageTypeMask) -> Self {
        DamageType::ALL.into_iter().filter(|t| mask.contains(*t)).collect()
    }
}

/// Set of death types. Serialized as a list of names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<DeathType>", into = "Vec<DeathType>")]
pub struct DeathTypeMask(u32);

impl DeathTypeMask {
    pub const NONE: DeathTypeMask = DeathTypeMask(0);
    pub const ALL: DeathTypeMask = DeathTypeMask((1 << DeathType::ALL.len()) - 1);

    #[must_use]
    pub fn of(types: &[DeathType]) -> Self {
        Self(types.iter().fold(0, |acc, t| acc | (1 << *t as u32)))
    }

    #[must_use]
    pub fn contains(self, t: DeathType) -> bool {
        self.0 & (1 << t as u32) != 0
    }
}

impl Default for DeathTypeMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<Vec<DeathType>> for DeathTypeMask {
    fn from(types: Vec<DeathType>) -> Self {
        Self::of(&types)
    }
}

impl From<DeathTypeMask> for Vec<DeathType> {
    fn from(mask: DeathTypeMask) -> Self {
        DeathType::ALL.into_iter().filter(|t| mask.contains(*t)).collect()
    }
}

/// Damage tier of a body, derived from its health ratio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BodyDamageType {
    #[default]
    Pristine = 0,
    Damaged,
    ReallyDamaged,
    Rubble,
}

impl BodyDamageType {
    pub const COUNT: usize = 4;

    /// Tier for a health ratio given the damaged / really-damaged thresholds.
    #[must_use]
    pub fn from_ratio(ratio: f32, damaged: f32, really_damaged: f32) -> Self {
        if ratio <= 0.0 {
            BodyDamageType::Rubble
        } else if ratio <= really_damaged {
            BodyDamageType::ReallyDamaged
        } else if ratio <= damaged {
            BodyDamageType::Damaged
        } else {
            BodyDamageType::Pristine
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Locomotion posture for AI-driven movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LocomotorSet {
    #[default]
    Normal = 0,
    Wander,
    Panic,
}

impl LocomotorSet {
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(LocomotorSet::Normal),
            1 => Some(LocomotorSet::Wander),
            2 => Some(LocomotorSet::Panic),
            _ => None,
        }
    }

    /// Speed multiplier relative to the object's base speed.
    #[must_use]
    pub fn speed_factor(self) -> f32 {
        match self {
            LocomotorSet::Normal => 1.0,
            LocomotorSet::Wander => 0.5,
            LocomotorSet::Panic => 1.5,
        }
    }
}
