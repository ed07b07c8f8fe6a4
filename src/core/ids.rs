//! Stable identifiers for simulation objects and teams.
//!
//! Every simulation object has a unique `ObjectId`. Modules never keep
//! references to other objects across a tick boundary; they keep the id and
//! re-resolve it through the registry, treating a miss as "that object is
//! gone".
//!
//! ## ID Layout
//!
//! - `0`: reserved, never names an object ([`ObjectId::INVALID`])
//! - `1..`: allocated monotonically by the registry, never reused within a run
//!
//! ```
//! use rts_behaviors::core::ObjectId;
//!
//! let id = ObjectId(7);
//! assert!(id.is_valid());
//! assert!(!ObjectId::INVALID.is_valid());
//! assert_eq!(ObjectId::from_option(None), ObjectId::INVALID);
//! ```

use serde::{Deserialize, Serialize};

/// Identifier for a simulation object.
///
/// Ids are handles, not owners: resolving one may legitimately fail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// The id that never names an object.
    pub const INVALID: ObjectId = ObjectId(0);

    /// Check whether this id could name an object.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// `Some(self)` for a valid id, `None` for [`ObjectId::INVALID`].
    #[must_use]
    pub const fn valid(self) -> Option<ObjectId> {
        if self.is_valid() {
            Some(self)
        } else {
            None
        }
    }

    /// Collapse an optional id into the invalid sentinel.
    #[must_use]
    pub fn from_option(id: Option<ObjectId>) -> Self {
        id.unwrap_or(Self::INVALID)
    }
}

impl From<u32> for ObjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

/// Controlling team of an object.
///
/// Objects on different teams are enemies; objects without a team are neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u8);

impl TeamId {
    /// Create a new team ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Team({})", self.0)
    }
}
