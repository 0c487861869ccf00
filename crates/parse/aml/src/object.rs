//! AML runtime objects.
//!
//! [`Object`] is the closed set of values the interpreter manipulates: data
//! (integers, strings, buffers, packages), named objects realized from the
//! bytecode (devices, methods, regions, fields, sync objects) and references.
//!
//! Objects never own other namespace objects. Packages, references, fields
//! and buffer fields point at their targets through [`AmlPath`]s or frame
//! slots and re-resolve them through the namespace on every access.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::error::AmlError;
use crate::name::{AmlPath, NameString};
use crate::sync::{AmlEvent, AmlMutex};

/// An AML value or named object.
#[derive(Debug, Clone, Default)]
pub enum Object {
    /// A local, argument or element that has not been assigned.
    #[default]
    Uninitialized,
    /// An integer (truncated to the table's integer width on arithmetic).
    Integer(u64),
    /// An ASCII string.
    String(String),
    /// A byte buffer.
    Buffer(Vec<u8>),
    /// An ordered list of elements. Named elements are stored as
    /// [`Reference::Unresolved`] and resolved on use.
    Package(Vec<Object>),
    /// A namespace scope with no value of its own (`\`, `\_SB_`, `Scope()`).
    Scope,
    /// A `Device` scope.
    Device,
    /// A control method.
    Method(Method),
    /// A `Mutex` synchronization object.
    Mutex(Arc<AmlMutex>),
    /// An `Event` synchronization object.
    Event(Arc<AmlEvent>),
    /// An `OperationRegion`.
    OpRegion(OpRegion),
    /// A field element declared by `Field`, `IndexField` or `BankField`.
    FieldUnit(FieldUnit),
    /// A bit range over a buffer (`CreateXField`, or the target of `Index`).
    BufferField(BufferField),
    /// A reference produced by `RefOf`, `Index` or a package name.
    Reference(Reference),
    /// A `Processor` scope.
    Processor(Processor),
    /// A `PowerResource` scope.
    PowerResource(PowerResource),
    /// A `ThermalZone` scope.
    ThermalZone,
    /// An `Alias` to another named object.
    Alias(AmlPath),
    /// The `Debug` pseudo-object (store-only sink).
    Debug,
}

impl Object {
    /// The integer `Ones` at 64-bit width.
    pub const ONES: Self = Self::Integer(u64::MAX);

    /// Returns the object's type as reported by `ObjectType`, without
    /// following references.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Uninitialized | Self::Scope => ObjectType::Uninitialized,
            Self::Integer(_) => ObjectType::Integer,
            Self::String(_) => ObjectType::String,
            Self::Buffer(_) => ObjectType::Buffer,
            Self::Package(_) => ObjectType::Package,
            Self::FieldUnit(_) => ObjectType::FieldUnit,
            Self::Device => ObjectType::Device,
            Self::Event(_) => ObjectType::Event,
            Self::Method(_) => ObjectType::Method,
            Self::Mutex(_) => ObjectType::Mutex,
            Self::OpRegion(_) => ObjectType::OpRegion,
            Self::PowerResource(_) => ObjectType::PowerResource,
            Self::Processor(_) => ObjectType::Processor,
            Self::ThermalZone => ObjectType::ThermalZone,
            Self::BufferField(_) => ObjectType::BufferField,
            Self::Debug => ObjectType::Debug,
            Self::Reference(_) | Self::Alias(_) => ObjectType::Reference,
        }
    }

    /// Returns `true` for objects that open a namespace scope (children may
    /// be declared beneath them).
    #[must_use]
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            Self::Scope
                | Self::Device
                | Self::Processor(_)
                | Self::PowerResource(_)
                | Self::ThermalZone
                | Self::Method(_)
        )
    }

    /// Returns the integer payload without any coercion.
    pub fn as_integer(&self) -> Result<u64, AmlError> {
        match self {
            Self::Integer(v) => Ok(*v),
            other => Err(AmlError::invalid_type(
                ObjectType::Integer,
                other.object_type(),
            )),
        }
    }

    /// Returns the string payload without any coercion.
    pub fn as_string(&self) -> Result<&str, AmlError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(AmlError::invalid_type(
                ObjectType::String,
                other.object_type(),
            )),
        }
    }

    /// Returns the buffer payload without any coercion.
    pub fn as_buffer(&self) -> Result<&[u8], AmlError> {
        match self {
            Self::Buffer(b) => Ok(b),
            other => Err(AmlError::invalid_type(
                ObjectType::Buffer,
                other.object_type(),
            )),
        }
    }

    /// Returns the package elements without any coercion.
    pub fn as_package(&self) -> Result<&[Object], AmlError> {
        match self {
            Self::Package(p) => Ok(p),
            other => Err(AmlError::invalid_type(
                ObjectType::Package,
                other.object_type(),
            )),
        }
    }

    /// Bracketed type name used when `Concatenate` has to turn a
    /// non-data object into a string (`[Package]`, `[Device]`, ...).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.object_type() {
            ObjectType::Uninitialized => "[Uninitialized Object]",
            ObjectType::Integer => "[Integer]",
            ObjectType::String => "[String]",
            ObjectType::Buffer => "[Buffer]",
            ObjectType::Package => "[Package]",
            ObjectType::FieldUnit => "[Field]",
            ObjectType::Device => "[Device]",
            ObjectType::Event => "[Event]",
            ObjectType::Method => "[Control Method]",
            ObjectType::Mutex => "[Mutex]",
            ObjectType::OpRegion => "[Operation Region]",
            ObjectType::PowerResource => "[Power Resource]",
            ObjectType::Processor => "[Processor]",
            ObjectType::ThermalZone => "[Thermal Zone]",
            ObjectType::BufferField => "[Buffer Field]",
            ObjectType::DdbHandle => "[Ddb Handle]",
            ObjectType::Debug => "[Debug Object]",
            ObjectType::Reference => "[Reference]",
        }
    }
}

/// Object type codes returned by the `ObjectType` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectType {
    /// Uninitialized objects and plain namespace scopes.
    Uninitialized = 0,
    /// Integer.
    Integer = 1,
    /// String.
    String = 2,
    /// Buffer.
    Buffer = 3,
    /// Package.
    Package = 4,
    /// Field, IndexField or BankField element.
    FieldUnit = 5,
    /// Device.
    Device = 6,
    /// Event.
    Event = 7,
    /// Control method.
    Method = 8,
    /// Mutex.
    Mutex = 9,
    /// Operation region.
    OpRegion = 10,
    /// Power resource.
    PowerResource = 11,
    /// Processor.
    Processor = 12,
    /// Thermal zone.
    ThermalZone = 13,
    /// Buffer field.
    BufferField = 14,
    /// DDB handle (never produced; table loading from AML is unsupported).
    DdbHandle = 15,
    /// Debug object.
    Debug = 16,
    /// Unresolved reference or alias. Never reported by `ObjectType`, which
    /// dereferences first.
    Reference = 0x14,
}

impl ObjectType {
    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> u64 {
        self as u64
    }
}

bitflags! {
    /// `MethodFlags` byte of a `DefMethod`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        /// Bits 2:0: number of arguments.
        const ARG_COUNT = 0b0000_0111;
        /// Bit 3: the method must be serialized by the caller.
        const SERIALIZED = 0b0000_1000;
        /// Bits 7:4: synchronization level.
        const SYNC_LEVEL = 0b1111_0000;
    }
}

impl MethodFlags {
    /// Number of arguments the method takes (0-7).
    #[must_use]
    pub const fn arg_count(self) -> u8 {
        self.bits() & Self::ARG_COUNT.bits()
    }

    /// Whether the method is declared `Serialized`.
    #[must_use]
    pub const fn serialized(self) -> bool {
        self.contains(Self::SERIALIZED)
    }

    /// Synchronization level (0-15).
    #[must_use]
    pub const fn sync_level(self) -> u8 {
        self.bits() >> 4
    }
}

/// Signature of a method implemented by the host instead of AML.
pub type NativeMethod = dyn Fn(&[Object]) -> Result<Object, AmlError> + Send + Sync;

/// The body of a control method.
#[derive(Clone)]
pub enum MethodCode {
    /// AML term list copied out of the defining table.
    Aml(Arc<[u8]>),
    /// Host-implemented method (e.g., `\_OSI`).
    Native(Arc<NativeMethod>),
}

impl core::fmt::Debug for MethodCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Aml(code) => write!(f, "Aml({} bytes)", code.len()),
            Self::Native(_) => f.write_str("Native"),
        }
    }
}

/// A control method.
#[derive(Debug, Clone)]
pub struct Method {
    /// Declaration flags (argument count, serialization, sync level).
    pub flags: MethodFlags,
    /// The method body.
    pub code: MethodCode,
}

impl Method {
    /// Number of arguments the method takes.
    #[must_use]
    pub fn arg_count(&self) -> u8 {
        self.flags.arg_count()
    }
}

/// Address space of an operation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSpace {
    /// System memory (MMIO).
    SystemMemory,
    /// x86 port I/O.
    SystemIo,
    /// PCI configuration space.
    PciConfig,
    /// Embedded controller.
    EmbeddedControl,
    /// SMBus.
    SmBus,
    /// CMOS.
    SystemCmos,
    /// PCI BAR target.
    PciBarTarget,
    /// IPMI.
    Ipmi,
    /// General purpose I/O.
    GeneralPurposeIo,
    /// Generic serial bus.
    GenericSerialBus,
    /// Platform communications channel.
    Pcc,
    /// OEM-defined space (0x80-0xFF).
    Oem(u8),
}

impl From<u8> for RegionSpace {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::SystemMemory,
            0x01 => Self::SystemIo,
            0x02 => Self::PciConfig,
            0x03 => Self::EmbeddedControl,
            0x04 => Self::SmBus,
            0x05 => Self::SystemCmos,
            0x06 => Self::PciBarTarget,
            0x07 => Self::Ipmi,
            0x08 => Self::GeneralPurposeIo,
            0x09 => Self::GenericSerialBus,
            0x0A => Self::Pcc,
            other => Self::Oem(other),
        }
    }
}

/// An `OperationRegion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRegion {
    /// Address space the region lives in.
    pub space: RegionSpace,
    /// Base address (or offset, for PCI config space).
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
    /// Scope the region was declared in, used to locate `_ADR`/`_SEG`/`_BBN`
    /// for PCI config regions.
    pub scope: AmlPath,
}

/// Access width selection of a field (`AccessType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// Any width the implementation likes.
    Any,
    /// 8-bit accesses.
    Byte,
    /// 16-bit accesses.
    Word,
    /// 32-bit accesses.
    DWord,
    /// 64-bit accesses.
    QWord,
    /// Buffer accesses (treated as byte-wide).
    Buffer,
}

impl AccessType {
    fn from_bits(bits: u8) -> Result<Self, AmlError> {
        Ok(match bits & 0x0F {
            0 => Self::Any,
            1 => Self::Byte,
            2 => Self::Word,
            3 => Self::DWord,
            4 => Self::QWord,
            5 => Self::Buffer,
            other => {
                return Err(AmlError::InvalidOpcode {
                    opcode: other,
                    extended: false,
                });
            }
        })
    }
}

/// Whether field accesses take the global lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRule {
    /// No locking.
    NoLock,
    /// Serialize the access on the global lock.
    Lock,
}

/// How the bits of an access unit outside the field are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    /// Read the unit and keep the other bits.
    Preserve,
    /// Write ones to the other bits.
    WriteAsOnes,
    /// Write zeros to the other bits.
    WriteAsZeros,
}

/// Access rules of a field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRules {
    /// Access width.
    pub access_type: AccessType,
    /// Global lock rule.
    pub lock_rule: LockRule,
    /// Rule for bits outside the field.
    pub update_rule: UpdateRule,
    /// `AccessAttrib` from an `AccessAs` entry (protocol spaces only).
    pub access_attrib: u8,
    /// `AccessLength` from an extended `AccessAs` entry.
    pub access_length: u8,
}

impl FieldRules {
    /// Decodes a `FieldFlags` byte.
    pub fn from_flags(flags: u8) -> Result<Self, AmlError> {
        Ok(Self {
            access_type: AccessType::from_bits(flags)?,
            lock_rule: if flags & 0x10 != 0 {
                LockRule::Lock
            } else {
                LockRule::NoLock
            },
            update_rule: match (flags >> 5) & 0x03 {
                0 => UpdateRule::Preserve,
                1 => UpdateRule::WriteAsOnes,
                2 => UpdateRule::WriteAsZeros,
                _ => return Err(AmlError::InvalidOpcode { opcode: flags, extended: false }),
            },
            access_attrib: 0,
            access_length: 0,
        })
    }

    /// Replaces the access type from an `AccessAs` byte, keeping the rest.
    pub fn with_access(self, access_type: u8, attrib: u8, length: u8) -> Result<Self, AmlError> {
        Ok(Self {
            access_type: AccessType::from_bits(access_type)?,
            access_attrib: attrib,
            access_length: length,
            ..self
        })
    }
}

/// How a field element reaches its backing storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// `Field`: directly in an operation region.
    Normal {
        /// The backing region.
        region: AmlPath,
    },
    /// `IndexField`: write the offset to `index`, then access `data`.
    Index {
        /// Index register field.
        index: AmlPath,
        /// Data register field.
        data: AmlPath,
    },
    /// `BankField`: write `bank_value` to `bank` before each access.
    Bank {
        /// The backing region.
        region: AmlPath,
        /// Bank select field.
        bank: AmlPath,
        /// Value selecting this field's bank.
        bank_value: u64,
    },
}

/// A field element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUnit {
    /// Where the bits live.
    pub kind: FieldKind,
    /// Bit offset from the start of the region (or index space).
    pub bit_offset: u64,
    /// Width in bits.
    pub bit_length: u64,
    /// Access rules.
    pub rules: FieldRules,
}

/// A bit range over a buffer.
#[derive(Debug, Clone)]
pub struct BufferField {
    /// The buffer the field views.
    pub source: Reference,
    /// Bit offset within the buffer.
    pub bit_offset: u64,
    /// Width in bits.
    pub bit_length: u64,
}

/// A `Processor` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processor {
    /// ACPI processor ID.
    pub id: u8,
    /// Processor block address.
    pub pblk_address: u32,
    /// Processor block length.
    pub pblk_len: u8,
}

/// A `PowerResource` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerResource {
    /// Deepest system sleep level the resource must be on for.
    pub system_level: u8,
    /// Order in which resources are turned on/off.
    pub resource_order: u16,
}

/// The target of a reference.
///
/// None of the variants own what they point to: named targets are
/// re-resolved through the namespace, frame slots through the current
/// method frame.
#[derive(Debug, Clone)]
pub enum Reference {
    /// A named object.
    Named(AmlPath),
    /// A name inside a package, resolved relative to `scope` when used.
    Unresolved {
        /// Scope the package was declared in.
        scope: AmlPath,
        /// The name as spelled in the package.
        name: NameString,
    },
    /// `LocalN` of the current frame.
    Local(u8),
    /// `ArgN` of the current frame.
    Arg(u8),
    /// Element `index` of the package at `source`.
    Element {
        /// Where the package lives.
        source: Box<Reference>,
        /// Element index.
        index: usize,
    },
    /// A byte (or bit range) of the buffer or string at `field.source`.
    Field(Box<BufferField>),
    /// A value with no storage location; writes through it are discarded.
    Temporary(Box<Object>),
    /// The `Debug` object.
    Debug,
}

impl Reference {
    /// Returns `true` if the reference points into a method frame.
    #[must_use]
    pub fn is_frame_relative(&self) -> bool {
        match self {
            Self::Local(_) | Self::Arg(_) => true,
            Self::Element { source, .. } => source.is_frame_relative(),
            Self::Field(field) => field.source.is_frame_relative(),
            _ => false,
        }
    }
}
