//! Data objects and data operators: `Buffer`, `Package`, `Store`,
//! `Concatenate`, `Mid`, `SizeOf`, `Match` and the explicit conversions.

use alloc::vec;
use alloc::vec::Vec;

use crate::Interpreter;
use crate::context::ParseContext;
use crate::convert;
use crate::error::AmlError;
use crate::handler::Handler;
use crate::name::NameString;
use crate::object::{Object, ObjectType, Reference};
use crate::opcode::*;
use crate::pkg_length::{self, MAX_PKG_LENGTH};

/// Resource template `EndTag` item (small resource type 0xF, length 1).
const END_TAG: u8 = 0x79;

impl<H: Handler> Interpreter<H> {
    /// `Buffer(BufferSize) {ByteList}`.
    pub(super) fn eval_buffer(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let body = pkg_length::split_body(&mut ctx.stream)?;
        let scope = ctx.scope;
        let mut inner = ctx.nested(body, scope);
        let size = self.eval_integer(&mut inner)?;
        let size = usize::try_from(size)
            .ok()
            .filter(|&s| s <= MAX_PKG_LENGTH)
            .ok_or(AmlError::InvalidPkgLength)?;
        let init = inner.stream.remaining();
        let mut bytes = vec![0u8; size.max(init.len())];
        bytes[..init.len()].copy_from_slice(init);
        Ok(Object::Buffer(bytes))
    }

    /// `Package` and `VarPackage`.
    ///
    /// Names among the elements are kept unresolved and looked up relative
    /// to the declaring scope when the element is used.
    pub(super) fn eval_package(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        variable: bool,
    ) -> Result<Object, AmlError> {
        let body = pkg_length::split_body(&mut ctx.stream)?;
        let scope = ctx.scope;
        let mut inner = ctx.nested(body, scope);
        let count = if variable {
            self.eval_integer(&mut inner)?
        } else {
            u64::from(inner.stream.read_u8()?)
        };
        let count = usize::try_from(count)
            .ok()
            .filter(|&c| c <= MAX_PKG_LENGTH)
            .ok_or(AmlError::InvalidPkgLength)?;

        let mut elements = Vec::with_capacity(count.min(inner.stream.len_remaining()));
        while !inner.stream.is_empty() {
            let element = if is_name_string_lead(inner.stream.peek()?) {
                let name = NameString::parse(&mut inner.stream)?;
                Object::Reference(Reference::Unresolved { scope, name })
            } else {
                self.eval_term_arg(&mut inner)?
            };
            elements.push(element);
        }
        if elements.len() > count {
            log::warn!(
                "aml: package in {scope} declares {count} elements but initializes {}",
                elements.len()
            );
            elements.truncate(count);
        }
        elements.resize(count, Object::Uninitialized);
        Ok(Object::Package(elements))
    }

    /// `Store(TermArg, SuperName)`.
    pub(super) fn eval_store(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let value = self.eval_term_arg(ctx)?;
        let target = self.parse_super_name(ctx)?;
        self.store(ctx.frame, &target, value.clone())?;
        Ok(value)
    }

    /// `CopyObject(TermArg, SimpleName)`.
    pub(super) fn eval_copy_object(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let value = self.eval_term_arg(ctx)?;
        let target = self.parse_super_name(ctx)?;
        self.copy_object(ctx.frame, &target, value.clone())?;
        Ok(value)
    }

    /// `Concatenate(Source1, Source2, Result)`.
    pub(super) fn eval_concat(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let a = self.eval_operand(ctx)?;
        let b = self.eval_operand(ctx)?;
        let target = self.parse_target(ctx)?;
        let result = convert::concat(&a, &b, self.integer_width())?;
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `ConcatenateResTemplate(Source1, Source2, Result)`: joins two resource
    /// templates, keeping a single end tag.
    pub(super) fn eval_concat_res(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let a = convert::to_buffer(&self.eval_operand(ctx)?, width)?;
        let b = convert::to_buffer(&self.eval_operand(ctx)?, width)?;
        let target = self.parse_target(ctx)?;

        let mut out = Vec::with_capacity(a.len() + b.len());
        out.extend_from_slice(strip_end_tag(&a));
        out.extend_from_slice(strip_end_tag(&b));
        out.extend_from_slice(&[END_TAG, 0]);
        let result = Object::Buffer(out);
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `ToBuffer`, `ToDecimalString`, `ToHexString` and `ToInteger`.
    pub(super) fn eval_conversion(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        op: u8,
    ) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let value = self.eval_operand(ctx)?;
        let target = self.parse_target(ctx)?;
        let result = match op {
            TO_BUFFER_OP => Object::Buffer(convert::to_buffer(&value, width)?),
            TO_DECIMAL_STRING_OP => Object::String(convert::to_decimal_string(&value, width)?),
            TO_HEX_STRING_OP => Object::String(convert::to_hex_string(&value, width)?),
            _ => Object::Integer(convert::explicit_to_integer(&value, width)?),
        };
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `ToString(Buffer, Length, Result)`.
    pub(super) fn eval_to_string(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let value = self.eval_operand(ctx)?;
        let length = self.eval_integer(ctx)?;
        let target = self.parse_target(ctx)?;
        let bytes = convert::to_buffer(&value, width)?;
        let max = if length == width.ones() {
            usize::MAX
        } else {
            usize::try_from(length).unwrap_or(usize::MAX)
        };
        let result = Object::String(convert::bytes_to_string(&bytes, max));
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `Mid(Source, Index, Length, Result)`.
    ///
    /// An index past the end yields an empty result; the length is clamped.
    pub(super) fn eval_mid(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let source = self.eval_operand(ctx)?;
        let index = self.eval_integer(ctx)?;
        let length = self.eval_integer(ctx)?;
        let target = self.parse_target(ctx)?;

        let window = |len: usize| {
            let start = usize::try_from(index).unwrap_or(usize::MAX).min(len);
            let end = start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX)).min(len);
            start..end
        };
        let result = match &source {
            Object::String(s) => {
                let bytes = &s.as_bytes()[window(s.len())];
                Object::String(convert::bytes_to_string(bytes, bytes.len()))
            }
            other => {
                let bytes = convert::to_buffer(other, width)?;
                Object::Buffer(bytes[window(bytes.len())].to_vec())
            }
        };
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `SizeOf(SuperName)`.
    pub(super) fn eval_size_of(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let source = self.parse_source(ctx)?;
        let value = self.read_reference(ctx.frame, &source)?;
        let value = match value {
            Object::Reference(inner) => self.read_reference(ctx.frame, &inner)?,
            other => other,
        };
        let size = match &value {
            Object::String(s) => s.len(),
            Object::Buffer(b) => b.len(),
            Object::Package(p) => p.len(),
            other => {
                return Err(AmlError::invalid_type(
                    ObjectType::Buffer,
                    other.object_type(),
                ));
            }
        };
        Ok(Object::Integer(size as u64))
    }

    /// `Match(SearchPackage, Op1, Operand1, Op2, Operand2, StartIndex)`.
    ///
    /// Returns the index of the first element satisfying both comparisons,
    /// or `Ones`. Elements that are not Integer, String or Buffer never match.
    pub(super) fn eval_match(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let package = self.eval_operand(ctx)?;
        let op1 = ctx.stream.read_u8()?;
        let operand1 = self.eval_operand(ctx)?;
        let op2 = ctx.stream.read_u8()?;
        let operand2 = self.eval_operand(ctx)?;
        let start = self.eval_integer(ctx)?;

        let elements = package.as_package()?;
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        for (index, element) in elements.iter().enumerate().skip(start) {
            if !matches!(
                element,
                Object::Integer(_) | Object::String(_) | Object::Buffer(_)
            ) {
                continue;
            }
            if match_one(element, op1, &operand1, width)? && match_one(element, op2, &operand2, width)? {
                return Ok(Object::Integer(index as u64));
            }
        }
        Ok(Object::Integer(width.ones()))
    }
}

/// Evaluates one `Match` comparison of `element` against `operand`.
fn match_one(
    element: &Object,
    op: u8,
    operand: &Object,
    width: crate::config::IntegerWidth,
) -> Result<bool, AmlError> {
    if op == 0 {
        return Ok(true);
    }
    let Ok(ordering) = convert::compare(element, operand, width) else {
        return Ok(false);
    };
    Ok(match op {
        1 => ordering.is_eq(),
        2 => ordering.is_le(),
        3 => ordering.is_lt(),
        4 => ordering.is_ge(),
        5 => ordering.is_gt(),
        _ => {
            return Err(AmlError::InvalidOpcode {
                opcode: op,
                extended: false,
            });
        }
    })
}

/// Returns `template` without its trailing end tag, if it has one.
fn strip_end_tag(template: &[u8]) -> &[u8] {
    match template {
        [rest @ .., END_TAG, _] => rest,
        other => other,
    }
}
