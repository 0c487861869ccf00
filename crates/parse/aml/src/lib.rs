//! `hadron-aml` --- an ACPI Machine Language interpreter.
//!
//! The interpreter loads DSDT/SSDT bytecode into a live namespace and runs
//! control methods on demand. It is a synchronous library: every call runs
//! on the caller's thread, and the only operations that block are AML
//! `Acquire` and `Wait`, through the kernel's [`Handler`].
//!
//! # Usage
//!
//! ```ignore
//! let aml = Interpreter::new(KernelAmlHandler, InterpreterConfig::default());
//! aml.load_table_with_revision(dsdt.aml(), dsdt.header().revision)?;
//! for ssdt in ssdts {
//!     aml.load_table(ssdt.aml())?;
//! }
//! aml.initialize_devices()?;
//! let sta = aml.evaluate(&AmlPath::parse_str("\\_SB.PCI0._STA")?, Vec::new())?;
//! ```
//!
//! # Layout
//!
//! - [`stream`], [`pkg_length`], [`name`]: primitive decoders.
//! - [`object`], [`convert`]: the value model and its coercions.
//! - [`namespace`]: the object tree and name lookup.
//! - [`context`] and the term parser: [`Interpreter::parse_object`].
//! - operators, method invocation, field access and device
//!   initialization are `impl` blocks on [`Interpreter`] in private modules.
//! - [`sync`], [`handler`]: the seams to the kernel.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod context;
pub mod convert;
mod device;
pub mod error;
mod field;
pub mod handler;
mod method;
pub mod name;
pub mod namespace;
pub mod object;
pub mod opcode;
mod ops;
mod parser;
pub mod pkg_length;
pub mod stream;
pub mod sync;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::{RwLock, RwLockReadGuard};

pub use config::{IntegerWidth, InterpreterConfig};
pub use context::{Control, Frame, ParseContext};
pub use device::InitSummary;
pub use error::AmlError;
pub use handler::{Handler, PciAddress};
pub use name::{AmlPath, NameSeg, NameString};
pub use namespace::{LookupMode, Namespace, WalkAction};
pub use object::{Method, MethodCode, MethodFlags, Object, ObjectType, Reference};
pub use sync::{Blocker, ThreadId};

use crate::sync::AmlMutex;

/// An AML interpreter bound to one namespace and one kernel [`Handler`].
pub struct Interpreter<H: Handler> {
    handler: H,
    config: InterpreterConfig,
    namespace: RwLock<Namespace>,
    /// Set once a revision 1 definition block is loaded.
    narrow_integers: AtomicBool,
    /// The ACPI global lock as seen by fields declared with `Lock`.
    global_lock: AmlMutex,
}

impl<H: Handler> Interpreter<H> {
    /// Creates an interpreter with an empty namespace.
    ///
    /// The namespace starts with the predefined scopes plus `\_OS_`,
    /// `\_REV` and the `\_OSI` method.
    pub fn new(handler: H, config: InterpreterConfig) -> Self {
        let mut namespace = Namespace::new();
        Self::add_predefined_objects(&mut namespace, &config);
        Self {
            narrow_integers: AtomicBool::new(config.integer_width == IntegerWidth::Bits32),
            handler,
            config,
            namespace: RwLock::new(namespace),
            global_lock: AmlMutex::new(0),
        }
    }

    fn add_predefined_objects(namespace: &mut Namespace, config: &InterpreterConfig) {
        let interfaces: Arc<[String]> = config.os_interfaces.iter().cloned().collect();
        let osi = move |args: &[Object]| -> Result<Object, AmlError> {
            let query = args.first().ok_or(AmlError::ArgumentCount {
                expected: 1,
                found: 0,
            })?;
            let query = query.as_string()?;
            let supported = interfaces.iter().any(|s| s == query);
            log::debug!("aml: _OSI(\"{query}\") -> {supported}");
            Ok(Object::Integer(if supported { u64::MAX } else { 0 }))
        };

        let predefined = [
            ("\\_OS", Object::String(String::from("Microsoft Windows NT"))),
            ("\\_REV", Object::Integer(config.revision)),
            (
                "\\_OSI",
                Object::Method(Method {
                    flags: MethodFlags::from_bits_retain(1),
                    code: MethodCode::Native(Arc::new(osi)),
                }),
            ),
        ];
        for (path, object) in predefined {
            // The namespace is fresh and the paths are constant.
            let inserted = AmlPath::parse_str(path).and_then(|p| namespace.insert(&p, object));
            debug_assert!(inserted.is_ok(), "predefined object {path}");
        }
    }

    /// Returns the kernel handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the configuration.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Current integer width.
    pub fn integer_width(&self) -> IntegerWidth {
        if self.narrow_integers.load(Ordering::Relaxed) {
            IntegerWidth::Bits32
        } else {
            IntegerWidth::Bits64
        }
    }

    /// Read access to the namespace.
    ///
    /// Do not hold the guard across calls back into the interpreter.
    pub fn namespace(&self) -> RwLockReadGuard<'_, Namespace> {
        self.namespace.read()
    }

    /// Loads a definition block (the AML following the table header) with
    /// 64-bit integers.
    pub fn load_table(&self, aml: &[u8]) -> Result<(), AmlError> {
        self.load_table_with_revision(aml, 2)
    }

    /// Loads a definition block whose header carries `revision`.
    ///
    /// A revision below 2 switches the interpreter to 32-bit integers. The
    /// load stops at the first malformed term; objects created before it
    /// remain in the namespace.
    pub fn load_table_with_revision(&self, aml: &[u8], revision: u8) -> Result<(), AmlError> {
        if IntegerWidth::for_revision(revision) == IntegerWidth::Bits32 {
            self.narrow_integers.store(true, Ordering::Relaxed);
        }
        log::debug!("aml: loading {} byte definition block (revision {revision})", aml.len());

        let mut frame = Frame::table();
        let mut ctx = ParseContext::new(stream::AmlStream::new(aml), AmlPath::ROOT, &mut frame);
        let result = self.run_term_list(&mut ctx);
        match result {
            Ok(Control::Normal) => {
                log::debug!("aml: definition block loaded");
                Ok(())
            }
            Ok(Control::Return(_)) => Err(AmlError::ReturnOutsideMethod),
            Ok(Control::Break | Control::Continue) => Err(AmlError::BreakOutsideLoop),
            Err(err) => {
                log::warn!(
                    "aml: definition block load failed at offset {:#x}: {err}",
                    ctx.stream.table_offset()
                );
                Err(err)
            }
        }
    }

    /// Evaluates the object at `path`.
    ///
    /// Methods are invoked with `args`; any other object yields its value
    /// (fields are read). A method that ends without `Return` yields
    /// [`Object::Uninitialized`].
    pub fn evaluate(&self, path: &AmlPath, args: Vec<Object>) -> Result<Object, AmlError> {
        self.evaluate_at_depth(path, args, 0)
    }

    /// Looks `name` up from `scope` and returns its path and a copy of the
    /// object.
    pub fn find_object(
        &self,
        scope: &AmlPath,
        name: &NameString,
        mode: LookupMode,
    ) -> Result<(AmlPath, Object), AmlError> {
        let namespace = self.namespace.read();
        let (path, object) = namespace.find_object(scope, name, mode)?;
        Ok((path, object.clone()))
    }
}

impl<H: Handler> core::fmt::Debug for Interpreter<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("integer_width", &self.integer_width())
            .finish_non_exhaustive()
    }
}
