//! Field access.
//!
//! Buffer fields are bit ranges over a Buffer or String object. Field units
//! are bit ranges over an operation region, reached directly (`Field`),
//! through an index/data register pair (`IndexField`) or after selecting a
//! bank (`BankField`).
//!
//! Field unit I/O is split into naturally aligned access units of the
//! field's access width. A unit the field only partly covers is completed
//! according to the field's update rule before it is written.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::Interpreter;
use crate::context::Frame;
use crate::convert;
use crate::error::AmlError;
use crate::handler::{Handler, PciAddress};
use crate::name::{AmlPath, NameSeg, NameString};
use crate::namespace::LookupMode;
use crate::object::{
    AccessType, BufferField, FieldKind, FieldUnit, LockRule, Object, ObjectType, OpRegion,
    RegionSpace, UpdateRule,
};
use crate::sync::WAIT_FOREVER;

/// Where the access units of a field unit live.
enum Backend {
    Region {
        region: OpRegion,
        pci: Option<PciAddress>,
    },
    Index {
        index: FieldUnit,
        data: FieldUnit,
    },
}

/// Holds the global lock for the duration of a `Lock` field access.
struct GlobalLockGuard<'a, H: Handler> {
    interpreter: &'a Interpreter<H>,
}

impl<H: Handler> Drop for GlobalLockGuard<'_, H> {
    fn drop(&mut self) {
        let released = self.interpreter.global_lock.release(&self.interpreter.handler);
        debug_assert!(released.is_ok(), "global lock released by non-owner");
    }
}

impl<H: Handler> Interpreter<H> {
    // ─── Buffer fields ─────────────────────────────────────────────────────

    /// Reads a buffer field: an Integer if it fits the integer width,
    /// otherwise a Buffer.
    pub(crate) fn read_buffer_field(&self, frame: &Frame, field: &BufferField) -> Result<Object, AmlError> {
        let source = match self.read_reference(frame, &field.source)? {
            Object::Reference(inner) => self.read_reference(frame, &inner)?,
            other => other,
        };
        let bytes = match &source {
            Object::Buffer(bytes) => bytes.as_slice(),
            Object::String(text) => text.as_bytes(),
            other => {
                return Err(AmlError::invalid_type(
                    ObjectType::Buffer,
                    other.object_type(),
                ));
            }
        };
        check_bit_range(field.bit_offset, field.bit_length, bytes.len())?;
        let bits = extract_bits(bytes, field.bit_offset, field.bit_length);
        Ok(self.bits_to_object(bits, field.bit_length))
    }

    /// Writes `value` into a buffer field. Bits of the field beyond the
    /// value are cleared.
    pub(crate) fn write_buffer_field(
        &self,
        frame: &mut Frame,
        field: &BufferField,
        value: &Object,
    ) -> Result<(), AmlError> {
        let bits = self.object_to_bits(value)?;
        let (offset, length) = (field.bit_offset, field.bit_length);
        self.with_location(frame, &field.source, &mut |slot: &mut Object| match slot {
            Object::Buffer(bytes) => {
                check_bit_range(offset, length, bytes.len())?;
                insert_bits(bytes, offset, length, &bits);
                Ok(())
            }
            Object::String(text) => {
                let mut bytes = text.as_bytes().to_vec();
                check_bit_range(offset, length, bytes.len())?;
                insert_bits(&mut bytes, offset, length, &bits);
                // The slot is left untouched unless the result is still ASCII.
                if !bytes.is_ascii() {
                    return Err(AmlError::InvalidString);
                }
                *text = bytes.into_iter().map(char::from).collect::<String>();
                Ok(())
            }
            other => Err(AmlError::invalid_type(
                ObjectType::Buffer,
                other.object_type(),
            )),
        })
    }

    // ─── Field units ───────────────────────────────────────────────────────

    /// Reads a field unit from its region.
    pub(crate) fn read_field(&self, field: &FieldUnit) -> Result<Object, AmlError> {
        let _lock = self.lock_for(field);
        self.select_bank(field)?;
        let backend = self.backend(field)?;
        let width = access_width(field);
        let unit_bits = u64::from(width) * 8;

        let mut out = vec![0u8; byte_len(field.bit_length)];
        for unit in field_units(field, unit_bits) {
            let value = self.read_unit(&backend, unit.byte_offset, width)?;
            let chunk = (value >> unit.lo) & low_mask(unit.hi - unit.lo);
            insert_bits(&mut out, unit.field_bit, unit.hi - unit.lo, &chunk.to_le_bytes());
        }
        Ok(self.bits_to_object(out, field.bit_length))
    }

    /// Writes `value` into a field unit.
    pub(crate) fn write_field(&self, field: &FieldUnit, value: &Object) -> Result<(), AmlError> {
        let bits = self.object_to_bits(value)?;
        let _lock = self.lock_for(field);
        self.select_bank(field)?;
        let backend = self.backend(field)?;
        let width = access_width(field);
        let unit_bits = u64::from(width) * 8;
        let unit_mask = low_mask(unit_bits);

        for unit in field_units(field, unit_bits) {
            let len = unit.hi - unit.lo;
            let mask = low_mask(len) << unit.lo;
            let chunk = le_to_u64(&extract_bits(&bits, unit.field_bit, len));
            let base = if mask == unit_mask {
                0
            } else {
                match field.rules.update_rule {
                    UpdateRule::Preserve => self.read_unit(&backend, unit.byte_offset, width)?,
                    UpdateRule::WriteAsOnes => unit_mask,
                    UpdateRule::WriteAsZeros => 0,
                }
            };
            let merged = (base & !mask) | ((chunk << unit.lo) & mask);
            self.write_unit(&backend, unit.byte_offset, width, merged)?;
        }
        Ok(())
    }

    fn lock_for(&self, field: &FieldUnit) -> Option<GlobalLockGuard<'_, H>> {
        if field.rules.lock_rule != LockRule::Lock {
            return None;
        }
        self.global_lock.acquire(&self.handler, WAIT_FOREVER);
        Some(GlobalLockGuard { interpreter: self })
    }

    /// Writes the bank selector of a `BankField` unit.
    fn select_bank(&self, field: &FieldUnit) -> Result<(), AmlError> {
        let FieldKind::Bank {
            bank, bank_value, ..
        } = &field.kind
        else {
            return Ok(());
        };
        let selector = self.field_unit_at(bank)?;
        self.write_field(&selector, &Object::Integer(*bank_value))
    }

    fn backend(&self, field: &FieldUnit) -> Result<Backend, AmlError> {
        match &field.kind {
            FieldKind::Normal { region } | FieldKind::Bank { region, .. } => {
                let region = {
                    let namespace = self.namespace.read();
                    match namespace.get(region) {
                        Some(Object::OpRegion(region)) => *region,
                        Some(other) => {
                            return Err(AmlError::invalid_type(
                                ObjectType::OpRegion,
                                other.object_type(),
                            ));
                        }
                        None => return Err(AmlError::ObjectNotFound(format!("{region}"))),
                    }
                };
                let pci = if region.space == RegionSpace::PciConfig {
                    Some(self.pci_address(&region.scope)?)
                } else {
                    None
                };
                Ok(Backend::Region { region, pci })
            }
            FieldKind::Index { index, data } => Ok(Backend::Index {
                index: self.field_unit_at(index)?,
                data: self.field_unit_at(data)?,
            }),
        }
    }

    fn field_unit_at(&self, path: &AmlPath) -> Result<FieldUnit, AmlError> {
        match self.namespace.read().get(path) {
            Some(Object::FieldUnit(field)) => Ok(field.clone()),
            Some(other) => Err(AmlError::invalid_type(
                ObjectType::FieldUnit,
                other.object_type(),
            )),
            None => Err(AmlError::ObjectNotFound(format!("{path}"))),
        }
    }

    fn read_unit(&self, backend: &Backend, byte_offset: u64, width: u8) -> Result<u64, AmlError> {
        let value = match backend {
            Backend::Region { region, pci } => {
                let address = region_address(region, byte_offset, width)?;
                match region.space {
                    RegionSpace::SystemMemory => self.handler.read_memory(address, width)?,
                    RegionSpace::SystemIo => self.handler.read_io(io_port(address)?, width)?,
                    RegionSpace::PciConfig => {
                        let pci = pci.ok_or(AmlError::Internal("PCI region without address"))?;
                        self.handler.read_pci(pci, config_offset(address)?, width)?
                    }
                    space => return Err(unsupported(space)),
                }
            }
            Backend::Index { index, data } => {
                self.write_field(index, &Object::Integer(byte_offset))?;
                convert::to_integer(&self.read_field(data)?, self.integer_width())?
            }
        };
        Ok(value & low_mask(u64::from(width) * 8))
    }

    fn write_unit(&self, backend: &Backend, byte_offset: u64, width: u8, value: u64) -> Result<(), AmlError> {
        match backend {
            Backend::Region { region, pci } => {
                let address = region_address(region, byte_offset, width)?;
                match region.space {
                    RegionSpace::SystemMemory => self.handler.write_memory(address, width, value),
                    RegionSpace::SystemIo => self.handler.write_io(io_port(address)?, width, value),
                    RegionSpace::PciConfig => {
                        let pci = pci.ok_or(AmlError::Internal("PCI region without address"))?;
                        self.handler.write_pci(pci, config_offset(address)?, width, value)
                    }
                    space => Err(unsupported(space)),
                }
            }
            Backend::Index { index, data } => {
                self.write_field(index, &Object::Integer(byte_offset))?;
                self.write_field(data, &Object::Integer(value))
            }
        }
    }

    /// Locates the PCI function owning a config space region declared in
    /// `scope`. Missing `_ADR`, `_SEG` or `_BBN` count as zero.
    fn pci_address(&self, scope: &AmlPath) -> Result<PciAddress, AmlError> {
        let adr = self.scope_integer(scope, "_ADR", LookupMode::NoSearch)?;
        let segment = self.scope_integer(scope, "_SEG", LookupMode::Search)?;
        let bus = self.scope_integer(scope, "_BBN", LookupMode::Search)?;
        Ok(PciAddress {
            segment: segment as u16,
            bus: bus as u8,
            device: (adr >> 16) as u8,
            function: (adr & 0xFFFF) as u8,
        })
    }

    fn scope_integer(&self, scope: &AmlPath, name: &str, mode: LookupMode) -> Result<u64, AmlError> {
        let name = NameString::from_seg(NameSeg::from_str(name));
        let found = self.namespace.read().lookup(scope, &name, mode);
        let path = match found {
            Ok(path) => path,
            Err(AmlError::ObjectNotFound(_)) => return Ok(0),
            Err(err) => return Err(err),
        };
        let value = self.evaluate(&path, Vec::new())?;
        convert::to_integer(&value, self.integer_width())
    }

    // ─── Conversions ───────────────────────────────────────────────────────

    /// Packs the little-endian bits of a field into an Integer or Buffer.
    fn bits_to_object(&self, mut bits: Vec<u8>, bit_length: u64) -> Object {
        if bit_length <= self.integer_width().bytes() as u64 * 8 {
            Object::Integer(le_to_u64(&bits))
        } else {
            bits.truncate(byte_len(bit_length));
            Object::Buffer(bits)
        }
    }

    /// The bytes written to a field for `value`, least significant first.
    fn object_to_bits(&self, value: &Object) -> Result<Vec<u8>, AmlError> {
        match value {
            Object::Integer(v) => Ok(v.to_le_bytes().to_vec()),
            Object::Buffer(bytes) => Ok(bytes.clone()),
            Object::String(text) => Ok(text.as_bytes().to_vec()),
            other => Err(AmlError::invalid_type(
                ObjectType::Integer,
                other.object_type(),
            )),
        }
    }
}

/// Bytes per access unit.
fn access_width(field: &FieldUnit) -> u8 {
    match field.rules.access_type {
        AccessType::Byte | AccessType::Buffer => 1,
        AccessType::Word => 2,
        AccessType::DWord => 4,
        AccessType::QWord => 8,
        AccessType::Any => {
            let first = field.bit_offset;
            let last = first + field.bit_length.max(1) - 1;
            [1u8, 2, 4, 8]
                .into_iter()
                .find(|&w| first / (u64::from(w) * 8) == last / (u64::from(w) * 8))
                .unwrap_or(8)
        }
    }
}

/// One access unit a field touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UnitSpan {
    /// Byte offset of the unit within the region (or index space).
    byte_offset: u64,
    /// First bit of the unit that belongs to the field.
    lo: u64,
    /// One past the last bit of the unit that belongs to the field.
    hi: u64,
    /// Position of bit `lo` within the field.
    field_bit: u64,
}

fn field_units(field: &FieldUnit, unit_bits: u64) -> impl Iterator<Item = UnitSpan> {
    let start = field.bit_offset;
    let end = start + field.bit_length;
    let first = start / unit_bits;
    let count = if field.bit_length == 0 {
        0
    } else {
        (end - 1) / unit_bits - first + 1
    };
    (first..first + count).map(move |unit| {
        let unit_start = unit * unit_bits;
        let lo = start.max(unit_start) - unit_start;
        let hi = end.min(unit_start + unit_bits) - unit_start;
        UnitSpan {
            byte_offset: unit * (unit_bits / 8),
            lo,
            hi,
            field_bit: unit_start + lo - start,
        }
    })
}

fn region_address(region: &OpRegion, byte_offset: u64, width: u8) -> Result<u64, AmlError> {
    if byte_offset + u64::from(width) > region.length {
        return Err(AmlError::RegionOutOfBounds);
    }
    region
        .offset
        .checked_add(byte_offset)
        .ok_or(AmlError::RegionOutOfBounds)
}

fn io_port(address: u64) -> Result<u16, AmlError> {
    u16::try_from(address).map_err(|_| AmlError::RegionOutOfBounds)
}

fn config_offset(address: u64) -> Result<u16, AmlError> {
    u16::try_from(address).map_err(|_| AmlError::RegionOutOfBounds)
}

fn unsupported(space: RegionSpace) -> AmlError {
    log::warn!("aml: field access to unsupported region space {space:?}");
    AmlError::UnsupportedRegionSpace(space)
}

fn check_bit_range(offset: u64, length: u64, len_bytes: usize) -> Result<(), AmlError> {
    let end = offset.saturating_add(length);
    if end > len_bytes as u64 * 8 {
        return Err(AmlError::IndexOutOfBounds {
            index: end.div_ceil(8),
            len: len_bytes as u64,
        });
    }
    Ok(())
}

fn byte_len(bits: u64) -> usize {
    usize::try_from(bits.div_ceil(8)).unwrap_or(usize::MAX)
}

fn low_mask(bits: u64) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

fn le_to_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .rev()
        .fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

fn get_bit(bytes: &[u8], bit: u64) -> bool {
    usize::try_from(bit / 8)
        .ok()
        .and_then(|i| bytes.get(i))
        .is_some_and(|&b| b & (1 << (bit % 8)) != 0)
}

fn set_bit(bytes: &mut [u8], bit: u64, value: bool) {
    let Some(byte) = usize::try_from(bit / 8).ok().and_then(|i| bytes.get_mut(i)) else {
        return;
    };
    let mask = 1 << (bit % 8);
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Copies `length` bits starting at bit `offset` of `bytes` into a fresh
/// little-endian byte vector. Bits past the end of `bytes` read as zero.
fn extract_bits(bytes: &[u8], offset: u64, length: u64) -> Vec<u8> {
    let mut out = vec![0u8; byte_len(length)];
    for i in 0..length {
        set_bit(&mut out, i, get_bit(bytes, offset + i));
    }
    out
}

/// Overwrites `length` bits of `target` starting at bit `offset` with the
/// low bits of `source`. Bits past the end of `source` are written as zero.
fn insert_bits(target: &mut [u8], offset: u64, length: u64, source: &[u8]) {
    for i in 0..length {
        set_bit(target, offset + i, get_bit(source, i));
    }
}
