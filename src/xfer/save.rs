//! Saving side of [`Xfer`], backed by bincode.

use serde::Serialize;

use super::{Xfer, XferMode, XferVersion};
use crate::core::XferError;

/// Writes state into an in-memory buffer.
#[derive(Debug, Default)]
pub struct XferSave {
    buf: Vec<u8>,
}

impl XferSave {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn put<T: Serialize>(&mut self, value: &T) -> Result<(), XferError> {
        bincode::serialize_into(&mut self.buf, value)?;
        Ok(())
    }
}

impl Xfer for XferSave {
    fn mode(&self) -> XferMode {
        XferMode::Save
    }

    fn xfer_version(
        &mut self,
        version: &mut XferVersion,
        current: XferVersion,
        _what: &'static str,
    ) -> Result<(), XferError> {
        *version = current;
        self.put(version)
    }

    fn xfer_u8(&mut self, value: &mut u8) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_bool(&mut self, value: &mut bool) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_u32(&mut self, value: &mut u32) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_i32(&mut self, value: &mut i32) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_u64(&mut self, value: &mut u64) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_f32(&mut self, value: &mut f32) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_string(&mut self, value: &mut String) -> Result<(), XferError> {
        self.put(value)
    }

    fn xfer_bytes(&mut self, value: &mut Vec<u8>) -> Result<(), XferError> {
        self.put(value)
    }
}
