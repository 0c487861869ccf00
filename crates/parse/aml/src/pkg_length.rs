//! PkgLength encoding.
//!
//! A PkgLength is 1-4 bytes. Bits 7:6 of the lead byte hold the number of
//! trailing bytes. A single-byte PkgLength stores the length in bits 5:0;
//! otherwise bits 3:0 of the lead byte are the low nibble and each trailing
//! byte contributes the next 8 bits. The encoded length counts the PkgLength
//! bytes themselves.

use crate::error::AmlError;
use crate::stream::AmlStream;

/// Largest value a 4-byte PkgLength can hold (28 bits).
pub const MAX_PKG_LENGTH: usize = (1 << 28) - 1;

/// A decoded PkgLength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkgLength {
    /// Total package length, including the PkgLength field.
    pub total: usize,
    /// Number of bytes the PkgLength field occupied (1-4).
    pub encoded_len: usize,
}

impl PkgLength {
    /// Bytes that follow the PkgLength field and belong to the package.
    #[must_use]
    pub const fn body_len(&self) -> usize {
        self.total - self.encoded_len
    }
}

/// Decodes a PkgLength at the cursor.
///
/// On failure the cursor is left where it was.
pub fn decode(stream: &mut AmlStream<'_>) -> Result<PkgLength, AmlError> {
    let (total, encoded_len) = peek_value(stream)?;
    if total < encoded_len {
        return Err(AmlError::InvalidPkgLength);
    }
    stream.skip(encoded_len)?;
    Ok(PkgLength { total, encoded_len })
}

/// Decodes the bit count of a field list entry.
///
/// Field lists reuse the PkgLength encoding for plain numbers, which do not
/// count the encoding's own bytes.
pub fn decode_field_length(stream: &mut AmlStream<'_>) -> Result<u64, AmlError> {
    let (value, encoded_len) = peek_value(stream)?;
    stream.skip(encoded_len)?;
    Ok(value as u64)
}

/// Reads the encoded value and its size without consuming anything.
fn peek_value(stream: &AmlStream<'_>) -> Result<(usize, usize), AmlError> {
    let lead = stream.peek()?;
    let extra = usize::from(lead >> 6);

    let total = if extra == 0 {
        usize::from(lead & 0x3F)
    } else {
        // Bits 5:4 must be zero in the multi-byte form.
        if lead & 0x30 != 0 {
            return Err(AmlError::InvalidPkgLength);
        }
        let mut length = usize::from(lead & 0x0F);
        for i in 0..extra {
            length |= usize::from(stream.peek_at(1 + i)?) << (4 + i * 8);
        }
        length
    };

    Ok((total, 1 + extra))
}

/// Decodes a PkgLength and splits off the package body as its own stream.
///
/// The cursor only moves if both the PkgLength and the body fit.
pub fn split_body<'a>(stream: &mut AmlStream<'a>) -> Result<AmlStream<'a>, AmlError> {
    let mut cursor = stream.clone();
    let pkg = decode(&mut cursor)?;
    let body = cursor.split_off(pkg.body_len())?;
    *stream = cursor;
    Ok(body)
}

/// Encodes a body length as a PkgLength.
///
/// `body_len` is the number of bytes following the PkgLength; the smallest
/// encoding that can describe `body_len` plus its own size is chosen.
/// Returns the encoded bytes and how many of them are used.
pub fn encode(body_len: usize) -> Result<([u8; 4], usize), AmlError> {
    let mut out = [0u8; 4];
    for encoded_len in 1..=4usize {
        let total = body_len + encoded_len;
        if encoded_len == 1 {
            if total <= 0x3F {
                out[0] = total as u8;
                return Ok((out, 1));
            }
            continue;
        }
        let limit = 1usize << (4 + 8 * (encoded_len - 1));
        if total < limit {
            out[0] = (((encoded_len - 1) as u8) << 6) | (total & 0x0F) as u8;
            for (i, byte) in out.iter_mut().enumerate().take(encoded_len).skip(1) {
                *byte = (total >> (4 + (i - 1) * 8)) as u8;
            }
            return Ok((out, encoded_len));
        }
    }
    Err(AmlError::InvalidPkgLength)
}
