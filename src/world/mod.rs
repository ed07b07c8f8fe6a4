//! The object world: templates, entities, the registry and terrain.
//!
//! ## Key Types
//!
//! - `ThingTemplate` / `TemplateStore`: immutable blueprints objects are built from
//! - `Entity`: one simulation object and its module slots
//! - `ObjectRegistry`: id allocation, lookup, two-phase destruction
//! - `Terrain`: ground height, water and cliff queries

pub mod entity;
pub mod registry;
pub mod templates;
pub mod terrain;

pub use entity::{AiState, Body, ContainState, Entity, ModuleSlot, PhysicsState};
pub use registry::ObjectRegistry;
pub use templates::{AiTemplate, TemplateStore, ThingTemplate};
pub use terrain::{Terrain, WaterArea};
