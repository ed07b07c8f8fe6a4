//! Error types.
//!
//! Two families: bad content detected while loading game data
//! ([`ConfigError`]) and save-game stream problems
//! ([`XferError`]). Stale object references are not errors; they are
//! `Option` misses handled by the caller.

use thiserror::Error;

use super::ids::ObjectId;

/// Invalid game data. Returned at load time; content must be fixed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown object template '{0}'")]
    UnknownTemplate(String),

    #[error("object template '{0}' registered twice")]
    DuplicateTemplate(String),

    #[error("unknown weapon template '{0}'")]
    UnknownWeapon(String),

    #[error("unknown object creation list '{0}'")]
    UnknownOcl(String),

    #[error("unknown fx list '{0}'")]
    UnknownFx(String),

    #[error("unknown upgrade '{0}'")]
    UnknownUpgrade(String),

    #[error("too many upgrades registered, cannot add '{0}'")]
    TooManyUpgrades(String),

    #[error("{module}: probability modifier must be at least 1, got {value}")]
    InvalidProbabilityModifier { module: &'static str, value: i32 },

    #[error("{module}: invalid {field}: {reason}")]
    InvalidValue {
        module: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Save-game stream failure.
#[derive(Error, Debug)]
pub enum XferError {
    #[error("{what}: stream version {found} is newer than supported version {current}")]
    VersionTooNew { what: &'static str, found: u8, current: u8 },

    #[error("stream codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("{object}: module slot {slot} holds {found}, expected {expected}")]
    ModuleMismatch {
        object: ObjectId,
        slot: usize,
        expected: String,
        found: String,
    },

    #[error("{object}: saved {saved} modules, template builds {built}")]
    ModuleCount { object: ObjectId, saved: usize, built: usize },

    #[error("{what}: {consumed} of {len} block bytes consumed")]
    BlockSize { what: &'static str, consumed: usize, len: usize },

    #[error("invalid data in stream: {0}")]
    InvalidData(String),

    #[error("game data rejected while loading: {0}")]
    Config(#[from] ConfigError),
}
