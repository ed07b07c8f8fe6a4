//! Loading side of [`Xfer`], backed by bincode.

use serde::de::DeserializeOwned;

use super::{Xfer, XferMode, XferVersion};
use crate::core::XferError;

/// Reads state back from a byte slice produced by [`super::XferSave`].
#[derive(Debug)]
pub struct XferLoad<'a> {
    data: &'a [u8],
    len: usize,
}

impl<'a> XferLoad<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            len: data.len(),
        }
    }

    /// Bytes read so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.len - self.data.len()
    }

    /// Total length of the input.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.data.is_empty()
    }

    fn take<T: DeserializeOwned>(&mut self) -> Result<T, XferError> {
        Ok(bincode::deserialize_from(&mut self.data)?)
    }
}

impl Xfer for XferLoad<'_> {
    fn mode(&self) -> XferMode {
        XferMode::Load
    }

    fn xfer_version(
        &mut self,
        version: &mut XferVersion,
        current: XferVersion,
        what: &'static str,
    ) -> Result<(), XferError> {
        let found: XferVersion = self.take()?;
        if found > current {
            return Err(XferError::VersionTooNew {
                what,
                found,
                current,
            });
        }
        *version = found;
        Ok(())
    }

    fn xfer_u8(&mut self, value: &mut u8) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_bool(&mut self, value: &mut bool) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_u32(&mut self, value: &mut u32) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_i32(&mut self, value: &mut i32) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_u64(&mut self, value: &mut u64) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_f32(&mut self, value: &mut f32) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_string(&mut self, value: &mut String) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }

    fn xfer_bytes(&mut self, value: &mut Vec<u8>) -> Result<(), XferError> {
        *value = self.take()?;
        Ok(())
    }
}
