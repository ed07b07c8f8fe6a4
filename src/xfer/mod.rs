//! Versioned, bidirectional state transfer.
//!
//! A module describes its persistent state once, in a single `xfer` method,
//! and that one description is used to save, to load, and to compute the
//! network-sync CRC. Each primitive is passed by `&mut`: saving reads it,
//! loading overwrites it, CRC folds it into a checksum.
//!
//! ## Versioning
//!
//! Every block starts with [`Xfer::xfer_version`]. Saving writes the current
//! version; loading reads the stored one, rejects anything newer, and hands
//! it back so the caller can branch on fields that were added later:
//!
//! ```
//! use rts_behaviors::xfer::{Xfer, XferLoad, XferSave};
//!
//! struct Counter { hits: u32, misses: u32 }
//!
//! impl Counter {
//!     fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), rts_behaviors::core::XferError> {
//!         let mut version = 2;
//!         xfer.xfer_version(&mut version, 2, "Counter")?;
//!         xfer.xfer_u32(&mut self.hits)?;
//!         if version >= 2 {
//!             xfer.xfer_u32(&mut self.misses)?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut save = XferSave::new();
//! Counter { hits: 3, misses: 1 }.xfer(&mut save).unwrap();
//!
//! let bytes = save.into_bytes();
//! let mut load = XferLoad::new(&bytes);
//! let mut restored = Counter { hits: 0, misses: 0 };
//! restored.xfer(&mut load).unwrap();
//! assert_eq!((restored.hits, restored.misses), (3, 1));
//! ```

mod crc;
mod load;
mod save;

pub use crc::XferCrc;
pub use load::XferLoad;
pub use save::XferSave;

use crate::core::{Coord3, ObjectId, XferError};

/// Stream format version of one block.
pub type XferVersion = u8;

/// Direction of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XferMode {
    Save,
    Load,
    Crc,
}

/// A typed, versioned stream that can save, load, or checksum state.
pub trait Xfer {
    fn mode(&self) -> XferMode;

    /// Transfer a block version.
    ///
    /// On save `version` is set to `current` and written. On load the stored
    /// version is read into `version`; a stored version newer than `current`
    /// is rejected.
    fn xfer_version(
        &mut self,
        version: &mut XferVersion,
        current: XferVersion,
        what: &'static str,
    ) -> Result<(), XferError>;

    fn xfer_u8(&mut self, value: &mut u8) -> Result<(), XferError>;
    fn xfer_bool(&mut self, value: &mut bool) -> Result<(), XferError>;
    fn xfer_u32(&mut self, value: &mut u32) -> Result<(), XferError>;
    fn xfer_i32(&mut self, value: &mut i32) -> Result<(), XferError>;
    fn xfer_u64(&mut self, value: &mut u64) -> Result<(), XferError>;
    fn xfer_f32(&mut self, value: &mut f32) -> Result<(), XferError>;
    fn xfer_string(&mut self, value: &mut String) -> Result<(), XferError>;

    /// Transfer an opaque length-prefixed byte block.
    fn xfer_bytes(&mut self, value: &mut Vec<u8>) -> Result<(), XferError>;

    fn is_loading(&self) -> bool {
        self.mode() == XferMode::Load
    }

    fn xfer_object_id(&mut self, id: &mut ObjectId) -> Result<(), XferError> {
        self.xfer_u32(&mut id.0)
    }

    fn xfer_coord3(&mut self, c: &mut Coord3) -> Result<(), XferError> {
        self.xfer_f32(&mut c.x)?;
        self.xfer_f32(&mut c.y)?;
        self.xfer_f32(&mut c.z)
    }

    /// Transfer a count-prefixed list of ids. Loading replaces the list.
    fn xfer_object_id_list(&mut self, list: &mut Vec<ObjectId>) -> Result<(), XferError> {
        let mut count = list.len() as u32;
        self.xfer_u32(&mut count)?;
        if self.is_loading() {
            list.clear();
            for _ in 0..count {
                let mut id = ObjectId::INVALID;
                self.xfer_object_id(&mut id)?;
                list.push(id);
            }
        } else {
            for id in list.iter_mut() {
                self.xfer_object_id(id)?;
            }
        }
        Ok(())
    }
}

/// Enums stored as one byte.
pub trait XferEnum: Copy {
    fn to_raw(self) -> u8;
    fn from_raw(raw: u8) -> Option<Self>;
}

/// Transfer a one-byte enum, rejecting unknown discriminants on load.
pub fn xfer_enum<E: XferEnum>(xfer: &mut dyn Xfer, value: &mut E) -> Result<(), XferError> {
    let mut raw = value.to_raw();
    xfer.xfer_u8(&mut raw)?;
    if xfer.is_loading() {
        *value = E::from_raw(raw)
            .ok_or_else(|| XferError::InvalidData(format!("enum discriminant {raw} out of range")))?;
    }
    Ok(())
}

impl XferEnum for crate::core::LocomotorSet {
    fn to_raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Option<Self> {
        Self::from_u8(raw)
    }
}

impl XferEnum for crate::core::DamageType {
    fn to_raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Option<Self> {
        Self::from_u8(raw)
    }
}

impl XferEnum for crate::core::DeathType {
    fn to_raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Option<Self> {
        Self::from_u8(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LocomotorSet;

    struct Sample {
        id: ObjectId,
        pos: Coord3,
        ids: Vec<ObjectId>,
        posture: LocomotorSet,
        name: String,
    }

    impl Sample {
        fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
            let mut version = 1;
            xfer.xfer_version(&mut version, 1, "Sample")?;
            xfer.xfer_object_id(&mut self.id)?;
            xfer.xfer_coord3(&mut self.pos)?;
            xfer.xfer_object_id_list(&mut self.ids)?;
            xfer_enum(xfer, &mut self.posture)?;
            xfer.xfer_string(&mut self.name)
        }
    }

    fn sample() -> Sample {
        Sample {
            id: ObjectId(4),
            pos: Coord3::new(1.5, -2.0, 3.25),
            ids: vec![ObjectId(7), ObjectId(9)],
            posture: LocomotorSet::Panic,
            name: "mine".into(),
        }
    }

    #[test]
    fn test_save_then_load() {
        let mut save = XferSave::new();
        sample().xfer(&mut save).unwrap();
        let bytes = save.into_bytes();

        let mut load = XferLoad::new(&bytes);
        let mut out = Sample {
            id: ObjectId::INVALID,
            pos: Coord3::zero(),
            ids: vec![ObjectId(1), ObjectId(2), ObjectId(3)],
            posture: LocomotorSet::Normal,
            name: String::new(),
        };
        out.xfer(&mut load).unwrap();
        assert!(load.is_exhausted());

        assert_eq!(out.id, ObjectId(4));
        assert_eq!(out.pos, Coord3::new(1.5, -2.0, 3.25));
        assert_eq!(out.ids, vec![ObjectId(7), ObjectId(9)]);
        assert_eq!(out.posture, LocomotorSet::Panic);
        assert_eq!(out.name, "mine");
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut save = XferSave::new();
        let mut version = 5;
        save.xfer_version(&mut version, 5, "Future").unwrap();
        let bytes = save.into_bytes();

        let mut load = XferLoad::new(&bytes);
        let mut version = 0;
        let err = load.xfer_version(&mut version, 3, "Future").unwrap_err();
        assert!(matches!(err, XferError::VersionTooNew { found: 5, current: 3, .. }));
    }

    #[test]
    fn test_truncated_stream() {
        let mut save = XferSave::new();
        sample().xfer(&mut save).unwrap();
        let bytes = save.into_bytes();

        let mut load = XferLoad::new(&bytes[..bytes.len() - 2]);
        let mut out = sample();
        assert!(matches!(out.xfer(&mut load), Err(XferError::Codec(_))));
    }

    #[test]
    fn test_bad_enum_rejected() {
        let mut save = XferSave::new();
        save.xfer_u8(&mut 77).unwrap();
        let bytes = save.into_bytes();

        let mut load = XferLoad::new(&bytes);
        let mut posture = LocomotorSet::Normal;
        assert!(matches!(xfer_enum(&mut load, &mut posture), Err(XferError::InvalidData(_))));
    }

    #[test]
    fn test_crc_is_state_sensitive() {
        let mut a = XferCrc::new();
        sample().xfer(&mut a).unwrap();

        let mut b = XferCrc::new();
        let mut changed = sample();
        changed.ids.push(ObjectId(10));
        changed.xfer(&mut b).unwrap();

        let mut c = XferCrc::new();
        sample().xfer(&mut c).unwrap();

        assert_ne!(a.crc(), b.crc());
        assert_eq!(a.crc(), c.crc());
    }
}
