//! References: reading through them, storing into them, and the reference
//! operators (`CondRefOf`, `DerefOf`, `Index`, `ObjectType`).
//!
//! A store resolves its target fresh on every call: named targets go
//! through the namespace under its write lock, frame slots through the
//! running [`Frame`]. `ArgX` slots holding a reference are written through.

use alloc::boxed::Box;
use alloc::format;

use crate::Interpreter;
use crate::context::{Frame, ParseContext};
use crate::convert;
use crate::error::AmlError;
use crate::handler::Handler;
use crate::name::{AmlPath, NameString};
use crate::namespace::LookupMode;
use crate::object::{BufferField, FieldUnit, Object, ObjectType, Reference};
use crate::opcode::is_name_string_lead;

/// Callback applied to a storage location.
pub(crate) type SlotFn<'a> = dyn FnMut(&mut Object) -> Result<(), AmlError> + 'a;

impl<H: Handler> Interpreter<H> {
    /// Reads the current value behind `reference`.
    ///
    /// Fields are read from hardware, buffer fields extracted, and package
    /// elements that are names come back as [`Reference::Named`]. Other
    /// named objects (devices, mutexes, methods) are returned as themselves.
    pub(crate) fn read_reference(&self, frame: &Frame, reference: &Reference) -> Result<Object, AmlError> {
        match reference {
            Reference::Named(path) => self.read_named(frame, path),
            Reference::Unresolved { scope, name } => {
                let path = self.namespace.read().lookup(scope, name, LookupMode::Search)?;
                self.read_named(frame, &path)
            }
            Reference::Local(n) => frame.local(*n).cloned(),
            Reference::Arg(n) => frame.arg(*n).cloned(),
            Reference::Element { source, index } => {
                let container = match self.read_reference(frame, source)? {
                    Object::Reference(inner) => self.read_reference(frame, &inner)?,
                    other => other,
                };
                let elements = container.as_package()?;
                let element = elements.get(*index).ok_or(AmlError::IndexOutOfBounds {
                    index: *index as u64,
                    len: elements.len() as u64,
                })?;
                match element {
                    Object::Reference(Reference::Unresolved { scope, name }) => {
                        let path = self.namespace.read().lookup(scope, name, LookupMode::Search)?;
                        Ok(Object::Reference(Reference::Named(path)))
                    }
                    other => Ok(other.clone()),
                }
            }
            Reference::Field(field) => self.read_buffer_field(frame, field),
            Reference::Temporary(value) => Ok((**value).clone()),
            Reference::Debug => Ok(Object::Debug),
        }
    }

    fn read_named(&self, frame: &Frame, path: &AmlPath) -> Result<Object, AmlError> {
        let object = {
            let namespace = self.namespace.read();
            let path = namespace.resolve_alias(path)?;
            namespace
                .get(&path)
                .cloned()
                .ok_or_else(|| AmlError::ObjectNotFound(format!("{path}")))?
        };
        match object {
            Object::FieldUnit(field) => self.read_field(&field),
            Object::BufferField(field) => self.read_buffer_field(frame, &field),
            other => Ok(other),
        }
    }

    /// Runs `f` on the storage behind `reference`.
    ///
    /// Temporaries get a scratch copy, so writes through them vanish.
    pub(crate) fn with_location(
        &self,
        frame: &mut Frame,
        reference: &Reference,
        f: &mut SlotFn<'_>,
    ) -> Result<(), AmlError> {
        match reference {
            Reference::Named(path) => {
                let mut namespace = self.namespace.write();
                let path = namespace.resolve_alias(path)?;
                let slot = namespace
                    .get_mut(&path)
                    .ok_or_else(|| AmlError::ObjectNotFound(format!("{path}")))?;
                f(slot)
            }
            Reference::Unresolved { scope, name } => {
                let path = self.namespace.read().lookup(scope, name, LookupMode::Search)?;
                self.with_location(frame, &Reference::Named(path), f)
            }
            Reference::Local(n) => f(frame.local_mut(*n)?),
            Reference::Arg(n) => match arg_reference(frame, *n) {
                Some(inner) => self.with_location(frame, &inner, f),
                None => f(frame.arg_mut(*n)?),
            },
            Reference::Element { source, index } => {
                let index = *index;
                let mut element = |container: &mut Object| -> Result<(), AmlError> {
                    match container {
                        Object::Package(elements) => {
                            let len = elements.len() as u64;
                            let slot = elements.get_mut(index).ok_or(AmlError::IndexOutOfBounds {
                                index: index as u64,
                                len,
                            })?;
                            f(slot)
                        }
                        other => Err(AmlError::invalid_type(
                            ObjectType::Package,
                            other.object_type(),
                        )),
                    }
                };
                self.with_location(frame, source, &mut element)
            }
            Reference::Temporary(value) => {
                let mut scratch = (**value).clone();
                f(&mut scratch)
            }
            Reference::Field(_) | Reference::Debug => {
                debug_assert!(false, "with_location on {reference:?}");
                Err(AmlError::Internal("reference has no object storage"))
            }
        }
    }

    /// Stores `value` into `target` with the implicit conversion rules of
    /// `Store`.
    ///
    /// Locals are overwritten. Named Integer, String and Buffer objects keep
    /// their type (buffers also keep their length); fields are written to
    /// hardware.
    pub(crate) fn store(&self, frame: &mut Frame, target: &Reference, value: Object) -> Result<(), AmlError> {
        match target {
            Reference::Debug => {
                log::info!("aml: Debug = {}", DebugValue(&value));
                Ok(())
            }
            Reference::Temporary(_) => Ok(()),
            Reference::Local(n) => {
                *frame.local_mut(*n)? = value;
                Ok(())
            }
            Reference::Arg(n) => match arg_reference(frame, *n) {
                Some(inner) => self.store(frame, &inner, value),
                None => {
                    *frame.arg_mut(*n)? = value;
                    Ok(())
                }
            },
            Reference::Field(field) => self.write_buffer_field(frame, field, &value),
            Reference::Unresolved { scope, name } => {
                let path = self.namespace.read().lookup(scope, name, LookupMode::Search)?;
                self.store(frame, &Reference::Named(path), value)
            }
            Reference::Named(path) => self.store_named(frame, path, value),
            Reference::Element { .. } => self.replace(frame, target, value),
        }
    }

    fn store_named(&self, frame: &mut Frame, path: &AmlPath, value: Object) -> Result<(), AmlError> {
        let current = {
            let namespace = self.namespace.read();
            let path = namespace.resolve_alias(path)?;
            match namespace.get(&path) {
                Some(Object::FieldUnit(field)) => NamedSlot::Field(field.clone()),
                Some(Object::BufferField(field)) => NamedSlot::BufferField(field.clone()),
                Some(_) => NamedSlot::Data,
                None => return Err(AmlError::ObjectNotFound(format!("{path}"))),
            }
        };
        match current {
            NamedSlot::Field(field) => self.write_field(&field, &value),
            NamedSlot::BufferField(field) => self.write_buffer_field(frame, &field, &value),
            NamedSlot::Data => {
                let width = self.integer_width();
                let mut value = Some(value);
                self.with_location(frame, &Reference::Named(*path), &mut |slot: &mut Object| {
                    let value = value.take().ok_or(AmlError::Internal("store applied twice"))?;
                    *slot = store_converting(slot, value, width)?;
                    Ok(())
                })
            }
        }
    }

    /// Overwrites the object behind `target` without conversion.
    fn replace(&self, frame: &mut Frame, target: &Reference, value: Object) -> Result<(), AmlError> {
        let mut value = Some(value);
        self.with_location(frame, target, &mut |slot: &mut Object| {
            *slot = value.take().ok_or(AmlError::Internal("store applied twice"))?;
            Ok(())
        })
    }

    /// `CopyObject` semantics: the target takes the value's type.
    ///
    /// Fields still go through their hardware write path.
    pub(crate) fn copy_object(&self, frame: &mut Frame, target: &Reference, value: Object) -> Result<(), AmlError> {
        match target {
            Reference::Debug | Reference::Temporary(_) | Reference::Field(_) => {
                self.store(frame, target, value)
            }
            Reference::Local(n) => {
                *frame.local_mut(*n)? = value;
                Ok(())
            }
            Reference::Arg(n) => match arg_reference(frame, *n) {
                Some(inner) => self.copy_object(frame, &inner, value),
                None => {
                    *frame.arg_mut(*n)? = value;
                    Ok(())
                }
            },
            Reference::Unresolved { scope, name } => {
                let path = self.namespace.read().lookup(scope, name, LookupMode::Search)?;
                self.copy_object(frame, &Reference::Named(path), value)
            }
            Reference::Named(path) => {
                let is_field = {
                    let namespace = self.namespace.read();
                    let path = namespace.resolve_alias(path)?;
                    matches!(
                        namespace.get(&path),
                        Some(Object::FieldUnit(_) | Object::BufferField(_))
                    )
                };
                if is_field {
                    self.store_named(frame, path, value)
                } else {
                    self.replace(frame, target, value)
                }
            }
            Reference::Element { .. } => self.replace(frame, target, value),
        }
    }

    /// `CondRefOf(SuperName, Target)`: `Ones` and a stored reference if the
    /// object exists, `Zero` otherwise.
    pub(super) fn eval_cond_ref_of(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let reference = if is_name_string_lead(ctx.stream.peek()?) {
            let name = NameString::parse(&mut ctx.stream)?;
            let found = self.namespace.read().lookup(&ctx.scope, &name, LookupMode::Search);
            match found {
                Ok(path) => Reference::Named(path),
                Err(AmlError::ObjectNotFound(_)) => {
                    self.parse_target(ctx)?;
                    return Ok(self.boolean(false));
                }
                Err(err) => return Err(err),
            }
        } else {
            self.parse_super_name(ctx)?
        };
        let target = self.parse_target(ctx)?;
        self.store_target(ctx, target, &Object::Reference(reference))?;
        Ok(self.boolean(true))
    }

    /// `DerefOf(ObjReference)`: the operand is a reference or a path
    /// string.
    pub(super) fn eval_deref_of(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        match self.eval_term_arg(ctx)? {
            Object::Reference(reference) => self.read_reference(ctx.frame, &reference),
            Object::String(text) => {
                let name = NameString::parse_str(&text)?;
                let path = self
                    .namespace
                    .read()
                    .lookup(&ctx.scope, &name, LookupMode::Search)?;
                self.read_reference(ctx.frame, &Reference::Named(path))
            }
            other => Err(AmlError::invalid_type(
                ObjectType::Reference,
                other.object_type(),
            )),
        }
    }

    /// `Index(BuffPkgStrObj, IndexValue, Target)`.
    ///
    /// Returns a reference to a package element or to one byte of a buffer
    /// or string.
    pub(super) fn eval_index(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let source = self.parse_source(ctx)?;
        let index = self.eval_integer(ctx)?;
        let target = self.parse_target(ctx)?;

        let (source, container) = match self.read_reference(ctx.frame, &source)? {
            Object::Reference(inner) => {
                let container = self.read_reference(ctx.frame, &inner)?;
                (inner, container)
            }
            other => (source, other),
        };
        let len = match &container {
            Object::Package(elements) => elements.len(),
            Object::Buffer(bytes) => bytes.len(),
            Object::String(text) => text.len(),
            other => {
                return Err(AmlError::invalid_type(
                    ObjectType::Package,
                    other.object_type(),
                ));
            }
        };
        let position = usize::try_from(index)
            .ok()
            .filter(|&i| i < len)
            .ok_or(AmlError::IndexOutOfBounds {
                index,
                len: len as u64,
            })?;

        let reference = if matches!(container, Object::Package(_)) {
            Reference::Element {
                source: Box::new(source),
                index: position,
            }
        } else {
            Reference::Field(Box::new(BufferField {
                source,
                bit_offset: position as u64 * 8,
                bit_length: 8,
            }))
        };
        let result = Object::Reference(reference);
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `ObjectType(SuperName)`. Fields are not read; references held in
    /// locals and arguments are followed once.
    pub(super) fn eval_object_type(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let source = self.parse_super_name(ctx)?;
        let object_type = match self.shallow_type(ctx.frame, &source)? {
            Some(object_type) => object_type,
            None => match self.read_reference(ctx.frame, &source)? {
                Object::Reference(inner) => match self.shallow_type(ctx.frame, &inner)? {
                    Some(object_type) => object_type,
                    None => self.read_reference(ctx.frame, &inner)?.object_type(),
                },
                other => other.object_type(),
            },
        };
        Ok(Object::Integer(object_type.code()))
    }

    /// The type of `reference` when it can be told without reading it.
    fn shallow_type(&self, frame: &Frame, reference: &Reference) -> Result<Option<ObjectType>, AmlError> {
        Ok(match reference {
            Reference::Named(path) => {
                let namespace = self.namespace.read();
                let path = namespace.resolve_alias(path)?;
                match namespace.get(&path) {
                    // Stored references are followed by the caller.
                    Some(Object::Reference(_)) | None => None,
                    Some(object) => Some(object.object_type()),
                }
            }
            Reference::Field(_) => Some(ObjectType::BufferField),
            Reference::Debug => Some(ObjectType::Debug),
            Reference::Local(n) => match frame.local(*n) {
                Err(AmlError::UninitializedLocal(_)) => Some(ObjectType::Uninitialized),
                _ => None,
            },
            Reference::Arg(n) => match frame.arg(*n) {
                Err(AmlError::UninitializedArg(_)) => Some(ObjectType::Uninitialized),
                _ => None,
            },
            _ => None,
        })
    }
}

enum NamedSlot {
    Field(FieldUnit),
    BufferField(BufferField),
    Data,
}

/// The reference held in `ArgN`, if the caller passed one.
fn arg_reference(frame: &Frame, n: u8) -> Option<Reference> {
    match frame.arg(n) {
        Ok(Object::Reference(inner)) => Some(inner.clone()),
        _ => None,
    }
}

/// Computes what a named object becomes after `Store`ing `value` into it.
fn store_converting(
    current: &Object,
    value: Object,
    width: crate::config::IntegerWidth,
) -> Result<Object, AmlError> {
    let is_data = matches!(
        value,
        Object::Integer(_) | Object::String(_) | Object::Buffer(_)
    );
    Ok(match current {
        Object::Integer(_) if is_data => Object::Integer(convert::to_integer(&value, width)?),
        Object::String(_) if is_data => Object::String(convert::to_string(&value, width)?),
        Object::Buffer(old) if is_data => {
            let mut bytes = convert::to_buffer(&value, width)?;
            bytes.resize(old.len(), 0);
            Object::Buffer(bytes)
        }
        Object::Integer(_)
        | Object::String(_)
        | Object::Buffer(_)
        | Object::Package(_)
        | Object::Reference(_)
        | Object::Uninitialized => value,
        other => {
            return Err(AmlError::invalid_type(
                value.object_type(),
                other.object_type(),
            ));
        }
    })
}

/// Renders a value for the `Debug` object log line.
struct DebugValue<'a>(&'a Object);

impl core::fmt::Display for DebugValue<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Object::Integer(v) => write!(f, "{v:#x}"),
            Object::String(s) => write!(f, "\"{s}\""),
            Object::Buffer(b) => write!(f, "Buffer {b:02x?}"),
            Object::Package(p) => write!(f, "Package ({} elements)", p.len()),
            other => write!(f, "{}", other.type_name()),
        }
    }
}
