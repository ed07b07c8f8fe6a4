//! Object templates and their registry.
//!
//! A `ThingTemplate` is the immutable blueprint an object is built from:
//! classification, footprint, health, optional AI and container
//! capabilities, and the list of behavior module data entries. Templates
//! are shared by every object built from them through an `Arc`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{ConfigError, GeometryInfo, KindOf};
use crate::modules::ModuleData;

/// Movement and perception of an AI-driven object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiTemplate {
    /// Distance covered per frame at the normal locomotor.
    pub speed: f32,
    /// Radius within which enemies are noticed.
    pub vision_range: f32,
}

/// Blueprint for one kind of simulation object.
///
/// ## Example
///
/// ```
/// use rts_behaviors::core::{GeometryInfo, KindOf};
/// use rts_behaviors::world::ThingTemplate;
///
/// let tank = ThingTemplate::new("Tank")
///     .with_kind(KindOf::VEHICLE)
///     .with_geometry(GeometryInfo::rect(12.0, 8.0))
///     .with_max_health(400.0)
///     .with_ai(3.0, 150.0);
///
/// assert_eq!(tank.name, "Tank");
/// assert!(tank.ai.is_some());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThingTemplate {
    pub name: String,

    #[serde(default)]
    pub kind: KindOf,

    #[serde(default)]
    pub geometry: GeometryInfo,

    #[serde(default = "default_max_health")]
    pub max_health: f32,

    #[serde(default)]
    pub ai: Option<AiTemplate>,

    /// Number of objects this one can contain, if it is a container.
    #[serde(default)]
    pub contain_capacity: Option<u32>,

    /// Behavior modules, in slot order.
    #[serde(default)]
    pub modules: Vec<ModuleData>,
}

fn default_max_health() -> f32 {
    100.0
}

impl ThingTemplate {
    /// A template with default footprint and health and no modules.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: KindOf::empty(),
            geometry: GeometryInfo::default(),
            max_health: default_max_health(),
            ai: None,
            contain_capacity: None,
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: KindOf) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: GeometryInfo) -> Self {
        self.geometry = geometry;
        self
    }

    #[must_use]
    pub fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Make the object AI-driven.
    #[must_use]
    pub fn with_ai(mut self, speed: f32, vision_range: f32) -> Self {
        self.ai = Some(AiTemplate { speed, vision_range });
        self
    }

    /// Make the object a container.
    #[must_use]
    pub fn with_container(mut self, capacity: u32) -> Self {
        self.contain_capacity = Some(capacity);
        self
    }

    /// Append a behavior module.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<ModuleData>) -> Self {
        self.modules.push(module.into());
        self
    }
}

/// Registry of object templates, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct TemplateStore {
    templates: FxHashMap<String, Arc<ThingTemplate>>,
}

impl TemplateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Names must be unique.
    pub fn register(&mut self, template: ThingTemplate) -> Result<(), ConfigError> {
        if self.templates.contains_key(&template.name) {
            return Err(ConfigError::DuplicateTemplate(template.name));
        }
        self.templates.insert(template.name.clone(), Arc::new(template));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ThingTemplate>> {
        self.templates.get(name)
    }

    /// Look up a template, failing with [`ConfigError::UnknownTemplate`].
    pub fn require(&self, name: &str) -> Result<&Arc<ThingTemplate>, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownTemplate(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates sorted by name.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Arc<ThingTemplate>> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut store = TemplateStore::new();
        store.register(ThingTemplate::new("Mine").with_kind(KindOf::MINE)).unwrap();
        store.register(ThingTemplate::new("Bunker")).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.require("Mine").unwrap().kind.contains(KindOf::MINE));
        assert!(matches!(store.require("Nope"), Err(ConfigError::UnknownTemplate(_))));

        let names: Vec<_> = store.iter_sorted().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Bunker", "Mine"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = TemplateStore::new();
        store.register(ThingTemplate::new("Mine")).unwrap();
        assert_eq!(
            store.register(ThingTemplate::new("Mine")),
            Err(ConfigError::DuplicateTemplate("Mine".into()))
        );
    }

    #[test]
    fn test_template_from_json() {
        let json = r#"{
            "name": "Rebel",
            "kind": "INFANTRY",
            "max_health": 60.0,
            "ai": { "speed": 2.0, "vision_range": 120.0 },
            "modules": [ { "module": "DestroyDie" } ]
        }"#;
        let template: ThingTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.name, "Rebel");
        assert_eq!(template.kind, KindOf::INFANTRY);
        assert_eq!(template.modules.len(), 1);
        assert_eq!(template.ai.unwrap().speed, 2.0);
        assert_eq!(template.contain_capacity, None);
    }
}
