//! Upgrade bits and the gating data shared by toggle-driven modules.
//!
//! An "upgrade" is a named boolean capability switch. Objects and teams hold
//! a set of them as an [`UpgradeMask`]; modules decide whether their toggle
//! is active from the union of the object's and its team's masks.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::flags::{DeathType, DeathTypeMask, StatusFlags};

/// A set of upgrades, one bit each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpgradeMask(pub u64);

impl UpgradeMask {
    pub const NONE: UpgradeMask = UpgradeMask(0);

    #[must_use]
    pub const fn bit(index: u8) -> Self {
        Self(1 << index)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn union(self, other: UpgradeMask) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersects(self, other: UpgradeMask) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn contains_all(self, other: UpgradeMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: UpgradeMask) {
        self.0 |= other.0;
    }
}

/// Registry of upgrade names.
///
/// Names are assigned bits in registration order; at most 64 upgrades.
#[derive(Clone, Debug, Default)]
pub struct UpgradeCenter {
    bits: FxHashMap<String, u8>,
}

impl UpgradeCenter {
    /// Create an empty upgrade registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an upgrade name, returning its mask. Re-registering is a no-op.
    pub fn register(&mut self, name: impl Into<String>) -> Result<UpgradeMask, ConfigError> {
        let name = name.into();
        if let Some(bit) = self.bits.get(&name) {
            return Ok(UpgradeMask::bit(*bit));
        }
        let bit = self.bits.len();
        if bit >= 64 {
            return Err(ConfigError::TooManyUpgrades(name));
        }
        self.bits.insert(name, bit as u8);
        Ok(UpgradeMask::bit(bit as u8))
    }

    /// Look up one upgrade.
    pub fn mask_of(&self, name: &str) -> Result<UpgradeMask, ConfigError> {
        self.bits
            .get(name)
            .map(|bit| UpgradeMask::bit(*bit))
            .ok_or_else(|| ConfigError::UnknownUpgrade(name.to_string()))
    }

    /// Union of several upgrades.
    pub fn mask_of_all<S: AsRef<str>>(&self, names: &[S]) -> Result<UpgradeMask, ConfigError> {
        names
            .iter()
            .try_fold(UpgradeMask::NONE, |acc, n| Ok(acc.union(self.mask_of(n.as_ref())?)))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bits.contains_key(name)
    }
}

/// Declarative toggle gating, as written in module data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeMuxData {
    /// Upgrades that switch the toggle on.
    pub triggered_by: Vec<String>,
    /// Upgrades that keep the toggle from taking effect.
    pub conflicts_with: Vec<String>,
    /// Require every `triggered_by` upgrade rather than any one.
    pub requires_all: bool,
    /// Toggle starts on without any upgrade.
    pub initially_active: bool,
}

impl UpgradeMuxData {
    /// Toggle that is on from construction.
    #[must_use]
    pub fn always_active() -> Self {
        Self {
            initially_active: true,
            ..Self::default()
        }
    }

    /// Toggle switched on by a single upgrade.
    #[must_use]
    pub fn triggered_by(name: impl Into<String>) -> Self {
        Self {
            triggered_by: vec![name.into()],
            ..Self::default()
        }
    }

    /// Resolve the names against the upgrade registry.
    pub fn resolve(&self, upgrades: &UpgradeCenter) -> Result<UpgradeMux, ConfigError> {
        Ok(UpgradeMux {
            triggered_by: upgrades.mask_of_all(&self.triggered_by)?,
            conflicts_with: upgrades.mask_of_all(&self.conflicts_with)?,
            requires_all: self.requires_all,
            initially_active: self.initially_active,
        })
    }
}

/// Resolved toggle gating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpgradeMux {
    pub triggered_by: UpgradeMask,
    pub conflicts_with: UpgradeMask,
    pub requires_all: bool,
    pub initially_active: bool,
}

impl UpgradeMux {
    /// Would holding `held` switch the toggle on?
    #[must_use]
    pub fn is_triggered(&self, held: UpgradeMask) -> bool {
        if self.triggered_by.is_empty() {
            return false;
        }
        if self.requires_all {
            held.contains_all(self.triggered_by)
        } else {
            held.intersects(self.triggered_by)
        }
    }

    #[must_use]
    pub fn conflicts(&self, held: UpgradeMask) -> bool {
        held.intersects(self.conflicts_with)
    }
}

/// A module's toggle: gating plus whether it has switched on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpgradeToggle {
    mux: UpgradeMux,
    executed: bool,
}

impl UpgradeToggle {
    #[must_use]
    pub fn new(mux: UpgradeMux) -> Self {
        Self {
            executed: mux.initially_active,
            mux,
        }
    }

    /// Has the toggle switched on (ignoring conflicts)?
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Is the toggle on and not suppressed by a conflicting upgrade?
    #[must_use]
    pub fn is_active(&self, held: UpgradeMask) -> bool {
        self.executed && !self.mux.conflicts(held)
    }

    /// Switch on if `held` triggers it. Returns true only on the transition.
    pub fn try_trigger(&mut self, held: UpgradeMask) -> bool {
        if self.executed || self.mux.conflicts(held) || !self.mux.is_triggered(held) {
            return false;
        }
        self.executed = true;
        true
    }

    /// Overwrite the executed flag (save-game restore).
    pub fn set_executed(&mut self, executed: bool) {
        self.executed = executed;
    }
}

/// Filter deciding whether a die module handles a given death.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DieMuxData {
    pub death_types: DeathTypeMask,
    /// Every one of these must be set on the dying object.
    pub required_status: StatusFlags,
    /// None of these may be set on the dying object.
    pub exempt_status: StatusFlags,
}

impl Default for DieMuxData {
    fn default() -> Self {
        Self {
            death_types: DeathTypeMask::ALL,
            required_status: StatusFlags::empty(),
            exempt_status: StatusFlags::empty(),
        }
    }
}

impl DieMuxData {
    /// Only these death types apply.
    #[must_use]
    pub fn for_deaths(types: &[DeathType]) -> Self {
        Self {
            death_types: DeathTypeMask::of(types),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_die_applicable(&self, status: StatusFlags, death: DeathType) -> bool {
        self.death_types.contains(death)
            && status.contains(self.required_status)
            && !status.intersects(self.exempt_status)
    }
}
