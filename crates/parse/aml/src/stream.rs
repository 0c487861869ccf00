//! Bounds-checked AML byte cursor.
//!
//! [`AmlStream`] is the only place the interpreter touches raw bytes. Every
//! read either advances the cursor and returns a value or fails with
//! [`AmlError::UnexpectedEnd`] without moving, so decoders never need their
//! own length checks.

use crate::error::AmlError;

/// A read-only view over AML bytecode with a cursor.
///
/// Cloning a stream is cheap and yields an independent cursor over the same
/// bytes, which is how `While` re-evaluates its predicate.
#[derive(Clone)]
pub struct AmlStream<'a> {
    data: &'a [u8],
    pos: usize,
    /// Offset of `data[0]` within the outermost table, for diagnostics.
    base: usize,
}

impl<'a> AmlStream<'a> {
    /// Creates a stream positioned at the first byte of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Returns the cursor position relative to the start of this stream.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the cursor position relative to the outermost table.
    #[must_use]
    pub const fn table_offset(&self) -> usize {
        self.base + self.pos
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub const fn len_remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns `true` if every byte has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the unread bytes without consuming them.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&self) -> Result<u8, AmlError> {
        self.peek_at(0)
    }

    /// Returns the byte `offset` bytes ahead without consuming anything.
    pub fn peek_at(&self, offset: usize) -> Result<u8, AmlError> {
        self.data
            .get(self.pos + offset)
            .copied()
            .ok_or(AmlError::UnexpectedEnd)
    }

    /// Consumes `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), AmlError> {
        if count > self.len_remaining() {
            return Err(AmlError::UnexpectedEnd);
        }
        self.pos += count;
        Ok(())
    }

    /// Consumes and returns the next `count` bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], AmlError> {
        if count > self.len_remaining() {
            return Err(AmlError::UnexpectedEnd);
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// Consumes a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], AmlError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Consumes one byte.
    pub fn read_u8(&mut self) -> Result<u8, AmlError> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Consumes a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, AmlError> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Consumes a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, AmlError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Consumes a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, AmlError> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Consumes the next `len` bytes and returns them as an independent
    /// stream.
    ///
    /// This is how package bodies are carved out: the parent cursor moves
    /// past the body, and the child can only see the body's bytes.
    pub fn split_off(&mut self, len: usize) -> Result<AmlStream<'a>, AmlError> {
        let base = self.table_offset();
        let data = self
            .read_bytes(len)
            .map_err(|_| AmlError::InvalidPkgLength)?;
        Ok(AmlStream { data, pos: 0, base })
    }

    /// Consumes every remaining byte and returns them as a stream.
    pub fn split_rest(&mut self) -> AmlStream<'a> {
        let base = self.table_offset();
        let data = &self.data[self.pos..];
        self.pos = self.data.len();
        AmlStream { data, pos: 0, base }
    }
}

impl core::fmt::Debug for AmlStream<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AmlStream")
            .field("offset", &self.table_offset())
            .field("remaining", &self.len_remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let mut s = AmlStream::new(&[0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(s.read_u16(), Ok(0x1234));
        assert_eq!(s.read_u32(), Ok(0x1234_5678));
        assert!(s.is_empty());
    }

    #[test]
    fn short_read_leaves_cursor() {
        let mut s = AmlStream::new(&[1, 2, 3]);
        s.skip(1).unwrap();
        assert_eq!(s.read_u32(), Err(AmlError::UnexpectedEnd));
        assert_eq!(s.position(), 1);
        assert_eq!(s.read_u16(), Ok(0x0302));
    }

    #[test]
    fn split_off_bounds_child() {
        let mut s = AmlStream::new(&[0xAA, 1, 2, 3, 0xBB]);
        s.skip(1).unwrap();
        let mut child = s.split_off(3).unwrap();
        assert_eq!(child.table_offset(), 1);
        assert_eq!(child.read_bytes(3).unwrap(), &[1, 2, 3]);
        assert_eq!(child.read_u8(), Err(AmlError::UnexpectedEnd));
        assert_eq!(s.read_u8(), Ok(0xBB));
    }

    #[test]
    fn split_off_overrun_is_pkg_length_error() {
        let mut s = AmlStream::new(&[1, 2]);
        assert_eq!(s.split_off(3).unwrap_err(), AmlError::InvalidPkgLength);
        assert_eq!(s.position(), 0);
    }
}
