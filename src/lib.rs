//! # rts-behaviors
//!
//! Deterministic, frame-stepped behavior modules for RTS simulation objects.
//!
//! ## Design Principles
//!
//! 1. **Lockstep-safe**: every random draw comes from the simulation's
//!    [`GameRng`], every iteration is in object-id order, and the scheduler
//!    runs due modules in `(frame, id, slot)` order. Two peers fed the same
//!    commands stay bit-identical, which [`Simulation::crc`] checks.
//!
//! 2. **Ids, not pointers**: objects refer to each other by [`ObjectId`]
//!    and re-resolve on every use. A stale id is a normal state transition,
//!    never a crash.
//!
//! 3. **Data-driven**: object templates and module data are serde structs,
//!    validated once when the simulation is built.
//!
//! ## Architecture
//!
//! - **Sleep scheduling**: update modules return an
//!   [`UpdateSleep`](core::UpdateSleep) and cost nothing while asleep.
//!
//! - **Persistent data structures**: objects live in an `im` map, so
//!   [`Simulation::fork`] is cheap.
//!
//! - **Versioned xfer**: each module describes its state once, and that
//!   description saves, loads and checksums it.
//!
//! ## Modules
//!
//! - `core`: ids, frames, RNG, geometry, flags, upgrades, config, errors
//! - `xfer`: versioned save/load/CRC streams
//! - `world`: templates, entities, the object registry, terrain
//! - `services`: weapons, fx and object creation lists
//! - `modules`: the behavior modules
//! - `sim`: the simulation, scheduler, damage pipeline and persistence

pub mod core;
pub mod modules;
pub mod services;
pub mod sim;
pub mod world;
pub mod xfer;

// Re-export commonly used types
pub use crate::core::{
    ConfigError, Coord3, Frame, GameRng, GameRngState, ObjectId, SimConfig, TeamId, UpdateSleep, XferError,
};

pub use crate::modules::{Module, ModuleData, ModuleHandle};

pub use crate::services::{EffectEvent, WeaponTemplate};

pub use crate::sim::{DamageInfo, GameData, Simulation};

pub use crate::world::{Entity, Terrain, ThingTemplate};
