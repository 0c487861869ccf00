//! Implicit and explicit data conversions.
//!
//! AML operators name the type they want (`Add` wants integers, `Concatenate`
//! follows its first operand) and the interpreter converts operands through
//! this module. Only the three data types convert into each other:
//!
//! | from \ to | Integer              | Buffer              | String                |
//! |-----------|----------------------|---------------------|-----------------------|
//! | Integer   | -                    | little-endian bytes | upper-case hex digits |
//! | Buffer    | little-endian bytes  | -                   | bytes as characters   |
//! | String    | hex digits           | characters as bytes | -                     |
//!
//! Every other source type fails with [`AmlError::InvalidType`].

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Write;

use crate::config::IntegerWidth;
use crate::error::AmlError;
use crate::object::{Object, ObjectType};

/// Converts `object` to an integer of the given width.
pub fn to_integer(object: &Object, width: IntegerWidth) -> Result<u64, AmlError> {
    match object {
        Object::Integer(v) => Ok(width.truncate(*v)),
        Object::Buffer(bytes) => Ok(le_bytes_to_integer(bytes, width)),
        Object::String(s) => Ok(parse_hex_prefix(s, width)),
        other => Err(AmlError::invalid_type(
            ObjectType::Integer,
            other.object_type(),
        )),
    }
}

/// Converts `object` to a byte buffer.
pub fn to_buffer(object: &Object, width: IntegerWidth) -> Result<Vec<u8>, AmlError> {
    match object {
        Object::Integer(v) => Ok(v.to_le_bytes()[..width.bytes()].to_vec()),
        Object::Buffer(bytes) => Ok(bytes.clone()),
        Object::String(s) => Ok(s.as_bytes().to_vec()),
        other => Err(AmlError::invalid_type(
            ObjectType::Buffer,
            other.object_type(),
        )),
    }
}

/// Converts `object` to a string.
pub fn to_string(object: &Object, width: IntegerWidth) -> Result<String, AmlError> {
    match object {
        Object::Integer(v) => Ok(format!(
            "{:0digits$X}",
            width.truncate(*v),
            digits = width.bytes() * 2
        )),
        Object::Buffer(bytes) => Ok(bytes_to_string(bytes, usize::MAX)),
        Object::String(s) => Ok(s.clone()),
        other => Err(AmlError::invalid_type(
            ObjectType::String,
            other.object_type(),
        )),
    }
}

/// Converts `object` to `target`, which must be Integer, Buffer or String.
pub fn convert(object: &Object, target: ObjectType, width: IntegerWidth) -> Result<Object, AmlError> {
    match target {
        ObjectType::Integer => to_integer(object, width).map(Object::Integer),
        ObjectType::Buffer => to_buffer(object, width).map(Object::Buffer),
        ObjectType::String => to_string(object, width).map(Object::String),
        _ => Err(AmlError::invalid_type(target, object.object_type())),
    }
}

/// Implements `Concatenate`.
///
/// The first operand selects the result type: an Integer or Buffer yields a
/// Buffer, a String yields a String, and anything else is rendered as its
/// bracketed type name and concatenated as a String.
pub fn concat(a: &Object, b: &Object, width: IntegerWidth) -> Result<Object, AmlError> {
    match a {
        Object::Integer(_) | Object::Buffer(_) => {
            let mut out = to_buffer(a, width)?;
            out.extend_from_slice(&to_buffer(b, width)?);
            Ok(Object::Buffer(out))
        }
        Object::String(s) => {
            let mut out = s.clone();
            out.push_str(&to_string(b, width)?);
            Ok(Object::String(out))
        }
        other => {
            let mut out = String::from(other.type_name());
            match to_string(b, width) {
                Ok(s) => out.push_str(&s),
                Err(_) => out.push_str(b.type_name()),
            }
            Ok(Object::String(out))
        }
    }
}

/// Compares two operands the way the logical operators do: `b` is converted
/// to the type of `a`, strings and buffers compare lexicographically.
pub fn compare(a: &Object, b: &Object, width: IntegerWidth) -> Result<Ordering, AmlError> {
    match a {
        Object::Integer(x) => Ok(width.truncate(*x).cmp(&to_integer(b, width)?)),
        Object::String(s) => Ok(s.as_bytes().cmp(to_string(b, width)?.as_bytes())),
        Object::Buffer(bytes) => Ok(bytes.as_slice().cmp(to_buffer(b, width)?.as_slice())),
        other => Err(AmlError::invalid_type(
            ObjectType::Integer,
            other.object_type(),
        )),
    }
}

/// Implements `ToInteger`: strings are decimal, or hex with a `0x` prefix.
pub fn explicit_to_integer(object: &Object, width: IntegerWidth) -> Result<u64, AmlError> {
    match object {
        Object::String(s) => {
            let s = s.trim_start();
            let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                parse_hex_prefix(hex, width)
            } else {
                s.bytes()
                    .take_while(u8::is_ascii_digit)
                    .fold(0u64, |acc, d| acc.wrapping_mul(10).wrapping_add(u64::from(d - b'0')))
            };
            Ok(width.truncate(value))
        }
        other => to_integer(other, width),
    }
}

/// Implements `ToHexString`.
pub fn to_hex_string(object: &Object, width: IntegerWidth) -> Result<String, AmlError> {
    match object {
        Object::Buffer(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 5);
            for (i, byte) in bytes.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "0x{byte:02X}");
            }
            Ok(out)
        }
        other => to_string(other, width),
    }
}

/// Implements `ToDecimalString`.
pub fn to_decimal_string(object: &Object, width: IntegerWidth) -> Result<String, AmlError> {
    match object {
        Object::Integer(v) => Ok(format!("{}", width.truncate(*v))),
        Object::Buffer(bytes) => {
            let mut out = String::new();
            for (i, byte) in bytes.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{byte}");
            }
            Ok(out)
        }
        Object::String(s) => Ok(s.clone()),
        other => Err(AmlError::invalid_type(
            ObjectType::String,
            other.object_type(),
        )),
    }
}

/// Renders buffer bytes as a string, stopping at a NUL or after `max` bytes.
///
/// Bytes outside printable ASCII become `?`.
#[must_use]
pub fn bytes_to_string(bytes: &[u8], max: usize) -> String {
    bytes
        .iter()
        .take(max)
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect()
}

/// Implements `ToBCD`.
#[must_use]
pub fn to_bcd(mut value: u64, width: IntegerWidth) -> u64 {
    let mut out = 0u64;
    let mut shift = 0;
    while value != 0 && shift < 64 {
        out |= (value % 10) << shift;
        value /= 10;
        shift += 4;
    }
    width.truncate(out)
}

/// Implements `FromBCD`. Nibbles above 9 are taken at face value.
#[must_use]
pub fn from_bcd(mut value: u64, width: IntegerWidth) -> u64 {
    let mut out = 0u64;
    let mut scale = 1u64;
    while value != 0 {
        out = out.wrapping_add((value & 0xF).wrapping_mul(scale));
        value >>= 4;
        scale = scale.wrapping_mul(10);
    }
    width.truncate(out)
}

fn le_bytes_to_integer(bytes: &[u8], width: IntegerWidth) -> u64 {
    bytes
        .iter()
        .take(width.bytes())
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (i * 8)))
}

/// Parses leading hex digits, stopping at the first non-hex character or
/// once the integer is full.
fn parse_hex_prefix(s: &str, width: IntegerWidth) -> u64 {
    let s = s.trim_start();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    s.chars()
        .map_while(|c| c.to_digit(16))
        .take(width.bytes() * 2)
        .fold(0u64, |acc, d| (acc << 4) | u64::from(d))
}
