//! Effect services consumed by behavior modules: weapons, fx lists and
//! object creation lists.

pub mod effects;
pub mod weapon;

pub use effects::{EffectEvent, EffectStore, ObjectCreationList, OclEntry};
pub use weapon::{xfer_weapon_slot, Weapon, WeaponStore, WeaponTemplate};
