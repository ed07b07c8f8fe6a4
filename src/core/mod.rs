//! Core simulation types: ids, frames, RNG, geometry, flags, configuration.
//!
//! These are leaf types with no knowledge of objects or modules.

pub mod ids;
pub mod frame;
pub mod rng;
pub mod geometry;
pub mod flags;
pub mod upgrade;
pub mod config;
pub mod error;

pub use ids::{ObjectId, TeamId};
pub use frame::{Frame, UpdateSleep, FOREVER};
pub use rng::{GameRng, GameRngState};
pub use geometry::{Coord3, GeometryInfo, GeometryShape};
pub use flags::{
    BodyDamageType, DamageType, DamageTypeMask, DeathType, DeathTypeMask, KindOf, LocomotorSet,
    ModelConditions, StatusFlags,
};
pub use upgrade::{DieMuxData, UpgradeCenter, UpgradeMask, UpgradeMux, UpgradeMuxData, UpgradeToggle};
pub use config::SimConfig;
pub use error::{ConfigError, XferError};
