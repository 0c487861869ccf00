//! Interpreter configuration.

use alloc::string::String;
use alloc::vec::Vec;

/// Width of AML integers.
///
/// Tables with a definition block revision below 2 use 32-bit integers;
/// everything else uses 64-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerWidth {
    /// 32-bit integers (revision 1 tables).
    Bits32,
    /// 64-bit integers.
    Bits64,
}

impl IntegerWidth {
    /// Selects the width for a definition block revision.
    #[must_use]
    pub const fn for_revision(revision: u8) -> Self {
        if revision < 2 { Self::Bits32 } else { Self::Bits64 }
    }

    /// Integer size in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    /// Mask of the valid integer bits; also the value of `Ones`.
    #[must_use]
    pub const fn ones(self) -> u64 {
        match self {
            Self::Bits32 => u32::MAX as u64,
            Self::Bits64 => u64::MAX,
        }
    }

    /// Truncates `value` to this width.
    #[must_use]
    pub const fn truncate(self, value: u64) -> u64 {
        value & self.ones()
    }
}

/// Strings `\_OSI` answers `Ones` for by default.
const DEFAULT_OS_INTERFACES: &[&str] = &[
    "Windows 2000",
    "Windows 2001",
    "Windows 2001 SP1",
    "Windows 2001 SP2",
    "Windows 2006",
    "Windows 2009",
    "Windows 2012",
    "Windows 2013",
    "Windows 2015",
    "Module Device",
    "Processor Device",
    "3.0 Thermal Model",
    "Extended Address Space Descriptor",
    "Processor Aggregator Device",
];

/// Tunables for an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Integer width until a table overrides it through
    /// [`load_table_with_revision`](crate::Interpreter::load_table_with_revision).
    pub integer_width: IntegerWidth,
    /// Maximum nesting of method invocations.
    pub max_call_depth: usize,
    /// Maximum iterations of a single `While` loop before it is aborted.
    pub max_loop_iterations: u64,
    /// Interface strings `\_OSI` reports as supported.
    pub os_interfaces: Vec<String>,
    /// Value of `Revision` and `\_REV`.
    pub revision: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            integer_width: IntegerWidth::Bits64,
            max_call_depth: 64,
            max_loop_iterations: 0xFFFF,
            os_interfaces: DEFAULT_OS_INTERFACES.iter().map(|&s| String::from(s)).collect(),
            revision: 2,
        }
    }
}

impl InterpreterConfig {
    /// Sets the initial integer width.
    #[must_use]
    pub fn with_integer_width(mut self, width: IntegerWidth) -> Self {
        self.integer_width = width;
        self
    }

    /// Sets the maximum method nesting depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Sets the `While` iteration limit.
    #[must_use]
    pub fn with_max_loop_iterations(mut self, iterations: u64) -> Self {
        self.max_loop_iterations = iterations;
        self
    }

    /// Adds an interface string for `\_OSI`.
    #[must_use]
    pub fn with_os_interface(mut self, interface: &str) -> Self {
        self.os_interfaces.push(String::from(interface));
        self
    }

    /// Sets the value reported by `Revision` and `\_REV`.
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_follows_revision() {
        assert_eq!(IntegerWidth::for_revision(1), IntegerWidth::Bits32);
        assert_eq!(IntegerWidth::for_revision(2), IntegerWidth::Bits64);
        assert_eq!(IntegerWidth::Bits32.truncate(0x1_2345_6789), 0x2345_6789);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = InterpreterConfig::default()
            .with_max_call_depth(8)
            .with_os_interface("Linux");
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.max_loop_iterations, 0xFFFF);
        assert!(config.os_interfaces.iter().any(|s| s == "Linux"));
    }
}
