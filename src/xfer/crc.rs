//! Checksum side of [`Xfer`].
//!
//! Folds every transferred byte into a rotating 32-bit sum so peers can
//! compare simulation state without exchanging it. Values are fed in the
//! same little-endian layout the save stream uses.

use super::{Xfer, XferMode, XferVersion};
use crate::core::XferError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XferCrc {
    crc: u32,
}

impl XferCrc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn crc(&self) -> u32 {
        self.crc
    }

    fn add_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let hibit = self.crc >> 31;
            self.crc = (self.crc << 1).wrapping_add(u32::from(b)).wrapping_add(hibit);
        }
    }
}

impl Xfer for XferCrc {
    fn mode(&self) -> XferMode {
        XferMode::Crc
    }

    fn xfer_version(
        &mut self,
        version: &mut XferVersion,
        current: XferVersion,
        _what: &'static str,
    ) -> Result<(), XferError> {
        *version = current;
        self.add_bytes(&[current]);
        Ok(())
    }

    fn xfer_u8(&mut self, value: &mut u8) -> Result<(), XferError> {
        self.add_bytes(&[*value]);
        Ok(())
    }

    fn xfer_bool(&mut self, value: &mut bool) -> Result<(), XferError> {
        self.add_bytes(&[u8::from(*value)]);
        Ok(())
    }

    fn xfer_u32(&mut self, value: &mut u32) -> Result<(), XferError> {
        self.add_bytes(&value.to_le_bytes());
        Ok(())
    }

    fn xfer_i32(&mut self, value: &mut i32) -> Result<(), XferError> {
        self.add_bytes(&value.to_le_bytes());
        Ok(())
    }

    fn xfer_u64(&mut self, value: &mut u64) -> Result<(), XferError> {
        self.add_bytes(&value.to_le_bytes());
        Ok(())
    }

    fn xfer_f32(&mut self, value: &mut f32) -> Result<(), XferError> {
        self.add_bytes(&value.to_bits().to_le_bytes());
        Ok(())
    }

    fn xfer_string(&mut self, value: &mut String) -> Result<(), XferError> {
        self.add_bytes(value.as_bytes());
        Ok(())
    }

    fn xfer_bytes(&mut self, value: &mut Vec<u8>) -> Result<(), XferError> {
        self.add_bytes(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotating_sum() {
        let mut crc = XferCrc::new();
        crc.xfer_u8(&mut 1).unwrap();
        assert_eq!(crc.crc(), 1);
        crc.xfer_u8(&mut 2).unwrap();
        assert_eq!(crc.crc(), 4);

        let mut high = XferCrc { crc: 0x8000_0000 };
        high.xfer_u8(&mut 0).unwrap();
        // high bit rotates back into bit zero
        assert_eq!(high.crc(), 1);
    }

    #[test]
    fn test_order_sensitive() {
        let mut a = XferCrc::new();
        a.xfer_u32(&mut 1).unwrap();
        a.xfer_u32(&mut 2).unwrap();

        let mut b = XferCrc::new();
        b.xfer_u32(&mut 2).unwrap();
        b.xfer_u32(&mut 1).unwrap();

        assert_ne!(a.crc(), b.crc());
    }
}
