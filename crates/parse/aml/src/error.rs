//! Interpreter error type.

use alloc::string::String;

use crate::object::{ObjectType, RegionSpace};

/// Errors produced while loading AML tables or evaluating methods.
///
/// Every variant is recoverable from the caller's point of view: a failed
/// table load or method evaluation leaves the namespace consistent (method
/// temporaries are always torn down) and the caller decides whether the
/// affected feature is simply unavailable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmlError {
    // ─── Malformed input ───────────────────────────────────────────────────
    /// The byte stream ended inside a term object.
    #[error("unexpected end of AML stream")]
    UnexpectedEnd,
    /// A PkgLength encoding was invalid or overran its enclosing package.
    #[error("invalid PkgLength")]
    InvalidPkgLength,
    /// A NameSeg contained a character outside `A-Z`, `0-9`, `_`.
    #[error("invalid NameSeg {0:02x?}")]
    InvalidNameSeg([u8; 4]),
    /// An opcode that does not start any known term object.
    #[error("invalid opcode {opcode:#04x} (extended: {extended})")]
    InvalidOpcode {
        /// The offending byte.
        opcode: u8,
        /// Whether the byte followed `ExtOpPrefix`.
        extended: bool,
    },
    /// A string literal was not ASCII or lacked its terminator.
    #[error("invalid string literal")]
    InvalidString,

    // ─── Name resolution ───────────────────────────────────────────────────
    /// A name did not resolve to any namespace object.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    /// A named object was declared twice in the same scope.
    #[error("object already exists: {0}")]
    ObjectAlreadyExists(String),
    /// A scope prefix walked above the root, or a parent scope is missing.
    #[error("invalid scope: {0}")]
    InvalidScope(String),
    /// A path exceeded the maximum supported namespace depth.
    #[error("namespace path too deep")]
    PathOverflow,

    // ─── Typing ────────────────────────────────────────────────────────────
    /// An operand could not be coerced to the type an operator needs.
    #[error("expected {expected:?}, found {found:?}")]
    InvalidType {
        /// The type the operator asked for.
        expected: ObjectType,
        /// The type of the operand.
        found: ObjectType,
    },
    /// A `LocalX` was read before anything was stored to it.
    #[error("Local{0} read before initialization")]
    UninitializedLocal(u8),
    /// An `ArgX` beyond the caller's argument count was read.
    #[error("Arg{0} read before initialization")]
    UninitializedArg(u8),

    // ─── Bounds ────────────────────────────────────────────────────────────
    /// `Index`, `Mid` or a buffer field reached past the end of its source.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index (bytes or elements).
        index: u64,
        /// The source's length.
        len: u64,
    },
    /// A field access fell outside its operation region.
    #[error("field access outside its operation region")]
    RegionOutOfBounds,

    // ─── Methods and control flow ──────────────────────────────────────────
    /// A method was invoked with the wrong number of arguments.
    #[error("method takes {expected} arguments, {found} given")]
    ArgumentCount {
        /// Declared `ArgCount`.
        expected: u8,
        /// Number of arguments supplied.
        found: usize,
    },
    /// Nested method invocations exceeded the configured depth.
    #[error("method call depth exceeded")]
    CallDepthExceeded,
    /// A `While` loop exceeded the configured iteration limit.
    #[error("loop iteration limit exceeded")]
    LoopLimitExceeded,
    /// `Return` appeared outside a method body.
    #[error("Return outside of a method")]
    ReturnOutsideMethod,
    /// `Break` or `Continue` appeared outside a `While` body.
    #[error("Break/Continue outside of a loop")]
    BreakOutsideLoop,
    /// `Release` on a mutex the current thread does not own.
    #[error("mutex not owned by the current thread")]
    NotMutexOwner,
    /// `Divide` or `Mod` with a zero divisor.
    #[error("division by zero")]
    DivideByZero,
    /// AML executed `Fatal`.
    #[error("AML fatal error: type {kind:#x}, code {code:#x}, arg {arg:#x}")]
    Fatal {
        /// `FatalType`.
        kind: u8,
        /// `FatalCode`.
        code: u32,
        /// `FatalArg`.
        arg: u64,
    },

    // ─── Hardware ──────────────────────────────────────────────────────────
    /// The handler does not support the requested address space.
    #[error("unsupported region space {0:?}")]
    UnsupportedRegionSpace(RegionSpace),
    /// The host handler reported a failure.
    #[error("handler error: {0}")]
    Handler(&'static str),

    // ─── Engine bugs ───────────────────────────────────────────────────────
    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl AmlError {
    /// Creates an [`AmlError::InvalidType`] for an operand of type `found`.
    #[must_use]
    pub fn invalid_type(expected: ObjectType, found: ObjectType) -> Self {
        Self::InvalidType { expected, found }
    }
}
