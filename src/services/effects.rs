//! Visual effect names, object creation lists, and the effect log.
//!
//! The simulation never renders anything. Triggering an fx list or firing
//! a weapon appends an [`EffectEvent`] to the effect log, which the
//! presentation layer (or a test) drains.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::{ConfigError, Coord3, Frame, ObjectId};

/// One line of an object creation list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OclEntry {
    /// Template to create.
    pub template: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Spawned objects are scattered up to this far from the source.
    #[serde(default)]
    pub offset_radius: f32,
}

fn default_count() -> u32 {
    1
}

/// Named list of objects to spawn together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectCreationList {
    pub name: String,
    pub entries: Vec<OclEntry>,
}

impl ObjectCreationList {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append `count` copies of `template`.
    #[must_use]
    pub fn with_entry(mut self, template: impl Into<String>, count: u32, offset_radius: f32) -> Self {
        self.entries.push(OclEntry {
            template: template.into(),
            count,
            offset_radius,
        });
        self
    }
}

/// Registry of fx names and object creation lists.
#[derive(Clone, Debug, Default)]
pub struct EffectStore {
    fx: FxHashSet<String>,
    ocls: FxHashMap<String, Arc<ObjectCreationList>>,
}

impl EffectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_fx(&mut self, name: impl Into<String>) {
        self.fx.insert(name.into());
    }

    pub fn register_ocl(&mut self, ocl: ObjectCreationList) {
        self.ocls.insert(ocl.name.clone(), Arc::new(ocl));
    }

    #[must_use]
    pub fn has_fx(&self, name: &str) -> bool {
        self.fx.contains(name)
    }

    #[must_use]
    pub fn ocl(&self, name: &str) -> Option<&Arc<ObjectCreationList>> {
        self.ocls.get(name)
    }

    pub fn require_fx(&self, name: &str) -> Result<(), ConfigError> {
        if self.has_fx(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownFx(name.to_string()))
        }
    }

    pub fn require_ocl(&self, name: &str) -> Result<&Arc<ObjectCreationList>, ConfigError> {
        self.ocl(name)
            .ok_or_else(|| ConfigError::UnknownOcl(name.to_string()))
    }

    /// Every creation list, sorted by name.
    pub fn ocls_sorted(&self) -> impl Iterator<Item = &Arc<ObjectCreationList>> {
        let mut all: Vec<_> = self.ocls.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all.into_iter()
    }
}

/// Something observable the simulation did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectEvent {
    Fx {
        frame: Frame,
        name: String,
        object: ObjectId,
        at: Coord3,
    },
    ObjectCreated {
        frame: Frame,
        ocl: String,
        source: ObjectId,
        created: ObjectId,
    },
    WeaponFired {
        frame: Frame,
        weapon: String,
        source: ObjectId,
        target: Coord3,
    },
    ObjectDestroyed {
        frame: Frame,
        object: ObjectId,
    },
}

impl EffectEvent {
    #[must_use]
    pub fn frame(&self) -> Frame {
        match self {
            EffectEvent::Fx { frame, .. }
            | EffectEvent::ObjectCreated { frame, .. }
            | EffectEvent::WeaponFired { frame, .. }
            | EffectEvent::ObjectDestroyed { frame, .. } => *frame,
        }
    }

    /// Name of the fx, if this is an fx event.
    #[must_use]
    pub fn fx_name(&self) -> Option<&str> {
        match self {
            EffectEvent::Fx { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Name of the weapon, if this is a weapon event.
    #[must_use]
    pub fn weapon_name(&self) -> Option<&str> {
        match self {
            EffectEvent::WeaponFired { weapon, .. } => Some(weapon),
            _ => None,
        }
    }
}
