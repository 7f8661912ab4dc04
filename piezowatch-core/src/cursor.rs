//! Little-endian byte cursor for fixed binary records
//!
//! Both record formats are read strictly front to back, so the cursor only
//! moves forward. A failed read leaves the offset untouched.
//!
//! ```rust
//! use piezowatch_core::cursor::BinaryCursor;
//!
//! let mut cursor = BinaryCursor::new(&[0x39, 0x69, 0x3C, 0x67, 0x64, 0x00]);
//! assert_eq!(cursor.read_u32_le(), Ok(1_732_012_345));
//! assert_eq!(cursor.read_u16_le(), Ok(100));
//! assert!(cursor.read_u8().is_err());
//! ```

use crate::errors::{DecodeError, DecodeResult};

/// Forward-only reader over a borrowed buffer
///
/// Invariant: `offset <= buffer.len()`.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> BinaryCursor<'a> {
    /// Start reading at the first byte of `buffer`
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Bytes consumed so far
    pub const fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left to read
    pub const fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        let [b] = self.take::<1>()?;
        Ok(b)
    }

    /// Read an unsigned 16-bit little-endian value
    pub fn read_u16_le(&mut self) -> DecodeResult<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    /// Read an unsigned 32-bit little-endian value
    pub fn read_u32_le(&mut self) -> DecodeResult<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    /// Read a signed 16-bit little-endian value
    pub fn read_i16_le(&mut self) -> DecodeResult<i16> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    /// Consume exactly `N` bytes or fail without moving
    fn take<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(DecodeError::OutOfBounds { needed: N, remaining });
        }

        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reads_advance_by_width() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let mut cursor = BinaryCursor::new(&bytes);

        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_u16_le().unwrap(), 0x0302);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.read_u32_le().unwrap(), 0x0706_0504);
        assert_eq!(cursor.position(), 7);
        assert_eq!(cursor.read_i16_le().unwrap(), 0x0908);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn signed_read_keeps_sign() {
        let mut cursor = BinaryCursor::new(&[0x00, 0x80, 0xFF, 0xFF]);
        assert_eq!(cursor.read_i16_le().unwrap(), i16::MIN);
        assert_eq!(cursor.read_i16_le().unwrap(), -1);
    }

    #[test]
    fn short_read_fails_without_moving() {
        let mut cursor = BinaryCursor::new(&[0xAA, 0xBB, 0xCC]);
        cursor.read_u8().unwrap();

        let err = cursor.read_u32_le().unwrap_err();
        assert_eq!(err, DecodeError::OutOfBounds { needed: 4, remaining: 2 });
        assert_eq!(cursor.position(), 1);

        // Narrower read still succeeds after the failure
        assert_eq!(cursor.read_u16_le().unwrap(), 0xCCBB);
    }

    #[test]
    fn empty_buffer() {
        let mut cursor = BinaryCursor::new(&[]);
        assert_eq!(cursor.remaining(), 0);
        assert!(matches!(
            cursor.read_u8(),
            Err(DecodeError::OutOfBounds { needed: 1, remaining: 0 })
        ));
    }

    proptest! {
        #[test]
        fn offset_never_exceeds_len(bytes in proptest::collection::vec(any::<u8>(), 0..64),
                                    widths in proptest::collection::vec(0u8..4, 0..40)) {
            let mut cursor = BinaryCursor::new(&bytes);
            for w in widths {
                let _ = match w {
                    0 => cursor.read_u8().map(|_| ()),
                    1 => cursor.read_u16_le().map(|_| ()),
                    2 => cursor.read_u32_le().map(|_| ()),
                    _ => cursor.read_i16_le().map(|_| ()),
                };
                prop_assert!(cursor.position() <= bytes.len());
                prop_assert_eq!(cursor.position() + cursor.remaining(), bytes.len());
            }
        }
    }
}
