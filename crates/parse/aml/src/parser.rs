//! Term parser.
//!
//! Recursive descent over the AML grammar. [`Interpreter::parse_object`]
//! consumes exactly one `TermObj` and executes it: named objects are added
//! to the namespace, statements run, and expressions are evaluated for their
//! side effects. Operand positions go through [`Interpreter::eval_term_arg`],
//! which yields the operand's value.
//!
//! The parser never backtracks. A failure anywhere inside a term propagates
//! out of the enclosing `parse_object` call.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::context::{Control, Frame, ParseContext};
use crate::convert;
use crate::error::AmlError;
use crate::handler::Handler;
use crate::name::{AmlPath, NameSeg, NameString};
use crate::namespace::LookupMode;
use crate::object::{
    BufferField, FieldKind, FieldRules, FieldUnit, Method, MethodCode, MethodFlags, Object,
    ObjectType, OpRegion, PowerResource, Processor, Reference, RegionSpace,
};
use crate::opcode::*;
use crate::pkg_length;
use crate::stream::AmlStream;
use crate::sync::{AmlEvent, AmlMutex};
use crate::Interpreter;

impl<H: Handler> Interpreter<H> {
    /// Parses and executes one term object at the cursor of `ctx`.
    ///
    /// Returns how control flow continues: [`Control::Normal`] unless the
    /// term was (or contained) a `Return`, `Break` or `Continue`.
    pub fn parse_object(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Control, AmlError> {
        let op = ctx.stream.peek()?;
        match op {
            IF_OP => {
                ctx.stream.skip(1)?;
                self.parse_if(ctx)
            }
            WHILE_OP => {
                ctx.stream.skip(1)?;
                self.parse_while(ctx)
            }
            RETURN_OP => {
                ctx.stream.skip(1)?;
                if !ctx.frame.in_method() {
                    return Err(AmlError::ReturnOutsideMethod);
                }
                let value = self.eval_term_arg(ctx)?;
                Ok(Control::Return(value))
            }
            BREAK_OP | CONTINUE_OP => {
                ctx.stream.skip(1)?;
                if ctx.frame.loop_depth == 0 {
                    return Err(AmlError::BreakOutsideLoop);
                }
                Ok(if op == BREAK_OP {
                    Control::Break
                } else {
                    Control::Continue
                })
            }
            NOOP_OP => {
                ctx.stream.skip(1)?;
                Ok(Control::Normal)
            }
            BREAKPOINT_OP => {
                ctx.stream.skip(1)?;
                log::warn!("aml: BreakPoint in {} ignored", ctx.scope);
                Ok(Control::Normal)
            }
            ELSE_OP => Err(AmlError::InvalidOpcode {
                opcode: op,
                extended: false,
            }),
            NAME_OP | SCOPE_OP | METHOD_OP | ALIAS_OP | EXTERNAL_OP | CREATE_BIT_FIELD_OP
            | CREATE_BYTE_FIELD_OP | CREATE_WORD_FIELD_OP | CREATE_DWORD_FIELD_OP
            | CREATE_QWORD_FIELD_OP | NOTIFY_OP => {
                ctx.stream.skip(1)?;
                self.parse_statement(ctx, op)
            }
            EXT_OP_PREFIX => self.parse_ext_object(ctx),
            _ => {
                self.eval_term_arg(ctx)?;
                Ok(Control::Normal)
            }
        }
    }

    /// Single-byte statements and named objects, opcode already consumed.
    fn parse_statement(&self, ctx: &mut ParseContext<'_, '_>, op: u8) -> Result<Control, AmlError> {
        match op {
            NAME_OP => self.parse_def_name(ctx)?,
            SCOPE_OP => return self.parse_def_scope(ctx),
            METHOD_OP => self.parse_def_method(ctx)?,
            ALIAS_OP => self.parse_def_alias(ctx)?,
            EXTERNAL_OP => {
                let name = NameString::parse(&mut ctx.stream)?;
                let _object_type = ctx.stream.read_u8()?;
                let _arg_count = ctx.stream.read_u8()?;
                log::trace!("aml: External({name}) skipped");
            }
            NOTIFY_OP => self.exec_notify(ctx)?,
            _ => self.parse_create_field(ctx, op)?,
        }
        Ok(Control::Normal)
    }

    fn parse_ext_object(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Control, AmlError> {
        let ext = ctx.stream.peek_at(1)?;
        match ext {
            EXT_MUTEX_OP | EXT_EVENT_OP | EXT_OP_REGION_OP | EXT_FIELD_OP | EXT_INDEX_FIELD_OP
            | EXT_BANK_FIELD_OP | EXT_DATA_REGION_OP | EXT_CREATE_FIELD_OP => {
                ctx.stream.skip(2)?;
                match ext {
                    EXT_MUTEX_OP => self.parse_def_mutex(ctx)?,
                    EXT_EVENT_OP => self.parse_def_event(ctx)?,
                    EXT_OP_REGION_OP => self.parse_def_op_region(ctx)?,
                    EXT_FIELD_OP => self.parse_def_field(ctx)?,
                    EXT_INDEX_FIELD_OP => self.parse_def_index_field(ctx)?,
                    EXT_BANK_FIELD_OP => self.parse_def_bank_field(ctx)?,
                    EXT_DATA_REGION_OP => self.parse_def_data_region(ctx)?,
                    _ => self.parse_create_field(ctx, EXT_CREATE_FIELD_OP)?,
                }
                Ok(Control::Normal)
            }
            EXT_DEVICE_OP | EXT_PROCESSOR_OP | EXT_POWER_RES_OP | EXT_THERMAL_ZONE_OP => {
                ctx.stream.skip(2)?;
                self.parse_def_scoped_object(ctx, ext)
            }
            EXT_RELEASE_OP | EXT_RESET_OP | EXT_SIGNAL_OP | EXT_SLEEP_OP | EXT_STALL_OP
            | EXT_FATAL_OP | EXT_LOAD_OP => {
                ctx.stream.skip(2)?;
                self.exec_ext_statement(ctx, ext)?;
                Ok(Control::Normal)
            }
            _ => {
                self.eval_term_arg(ctx)?;
                Ok(Control::Normal)
            }
        }
    }

    /// Runs every term in `ctx` until the stream is exhausted or control
    /// flow leaves the list.
    pub(crate) fn run_term_list(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Control, AmlError> {
        while !ctx.stream.is_empty() {
            match self.parse_object(ctx)? {
                Control::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Control::Normal)
    }

    // ─── Operands ──────────────────────────────────────────────────────────

    /// Evaluates one `TermArg` and returns its value.
    ///
    /// Names yield a copy of data objects, read fields, and invoke methods;
    /// other named objects yield a [`Reference::Named`].
    pub(crate) fn eval_term_arg(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let op = ctx.stream.peek()?;
        match op {
            ZERO_OP | ONE_OP | ONES_OP | BYTE_PREFIX | WORD_PREFIX | DWORD_PREFIX
            | QWORD_PREFIX | STRING_PREFIX => self.parse_constant(&mut ctx.stream),
            LOCAL0_OP..=LOCAL7_OP => {
                ctx.stream.skip(1)?;
                ctx.frame.local(op - LOCAL0_OP).cloned()
            }
            ARG0_OP..=ARG6_OP => {
                ctx.stream.skip(1)?;
                ctx.frame.arg(op - ARG0_OP).cloned()
            }
            EXT_OP_PREFIX => {
                let ext = ctx.stream.peek_at(1)?;
                ctx.stream.skip(2)?;
                self.eval_ext_operator(ctx, ext)
            }
            b if is_name_string_lead(b) => self.eval_name(ctx),
            _ => {
                ctx.stream.skip(1)?;
                self.eval_operator(ctx, op)
            }
        }
    }

    /// Evaluates a `TermArg` and dereferences it if it evaluated to a
    /// reference, for operators that need a value.
    pub(crate) fn eval_operand(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        match self.eval_term_arg(ctx)? {
            Object::Reference(reference) => self.read_reference(ctx.frame, &reference),
            other => Ok(other),
        }
    }

    /// Evaluates a `TermArg => Integer`.
    pub(crate) fn eval_integer(&self, ctx: &mut ParseContext<'_, '_>) -> Result<u64, AmlError> {
        let value = self.eval_operand(ctx)?;
        convert::to_integer(&value, self.integer_width())
    }

    fn parse_constant(&self, stream: &mut AmlStream<'_>) -> Result<Object, AmlError> {
        let op = stream.read_u8()?;
        Ok(match op {
            ZERO_OP => Object::Integer(0),
            ONE_OP => Object::Integer(1),
            ONES_OP => Object::Integer(self.integer_width().ones()),
            BYTE_PREFIX => Object::Integer(stream.read_u8()?.into()),
            WORD_PREFIX => Object::Integer(stream.read_u16()?.into()),
            DWORD_PREFIX => Object::Integer(stream.read_u32()?.into()),
            QWORD_PREFIX => Object::Integer(self.integer_width().truncate(stream.read_u64()?)),
            _ => Object::String(parse_string(stream)?),
        })
    }

    fn eval_name(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let name = NameString::parse(&mut ctx.stream)?;
        let (path, object) = self.find_object(&ctx.scope, &name, LookupMode::Search)?;
        match object {
            Object::Method(method) => {
                let mut args = Vec::with_capacity(usize::from(method.arg_count()));
                for _ in 0..method.arg_count() {
                    let arg = self.eval_term_arg(ctx)?;
                    args.push(self.detach(ctx.frame, arg)?);
                }
                self.invoke(&path, &method, args, ctx.frame.depth() + 1)
            }
            Object::FieldUnit(field) => self.read_field(&field),
            Object::BufferField(field) => self.read_buffer_field(ctx.frame, &field),
            data @ (Object::Integer(_)
            | Object::String(_)
            | Object::Buffer(_)
            | Object::Package(_)) => Ok(data),
            _ => Ok(Object::Reference(Reference::Named(path))),
        }
    }

    // ─── Targets ───────────────────────────────────────────────────────────

    /// Parses a `Target`: a `SuperName` or `NullName` (no store).
    pub(crate) fn parse_target(
        &self,
        ctx: &mut ParseContext<'_, '_>,
    ) -> Result<Option<Reference>, AmlError> {
        if ctx.stream.peek()? == NULL_NAME {
            ctx.stream.skip(1)?;
            return Ok(None);
        }
        self.parse_super_name(ctx).map(Some)
    }

    /// Parses a `SuperName` as a storage location. Methods named here are not
    /// invoked.
    pub(crate) fn parse_super_name(
        &self,
        ctx: &mut ParseContext<'_, '_>,
    ) -> Result<Reference, AmlError> {
        let op = ctx.stream.peek()?;
        match op {
            LOCAL0_OP..=LOCAL7_OP => {
                ctx.stream.skip(1)?;
                Ok(Reference::Local(op - LOCAL0_OP))
            }
            ARG0_OP..=ARG6_OP => {
                ctx.stream.skip(1)?;
                Ok(Reference::Arg(op - ARG0_OP))
            }
            EXT_OP_PREFIX if ctx.stream.peek_at(1)? == EXT_DEBUG_OP => {
                ctx.stream.skip(2)?;
                Ok(Reference::Debug)
            }
            b if is_name_string_lead(b) => {
                let name = NameString::parse(&mut ctx.stream)?;
                let path = self
                    .namespace
                    .read()
                    .lookup(&ctx.scope, &name, LookupMode::Search)?;
                Ok(Reference::Named(path))
            }
            _ => match self.eval_term_arg(ctx)? {
                Object::Reference(reference) => Ok(reference),
                other => Err(AmlError::invalid_type(
                    ObjectType::Reference,
                    other.object_type(),
                )),
            },
        }
    }

    /// Parses the source operand of `Index`, `SizeOf` and the buffer field
    /// creators: a location if the operand names one, otherwise a temporary
    /// holding the evaluated value.
    pub(crate) fn parse_source(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Reference, AmlError> {
        let op = ctx.stream.peek()?;
        match op {
            LOCAL0_OP..=LOCAL7_OP | ARG0_OP..=ARG6_OP => self.parse_super_name(ctx),
            b if is_name_string_lead(b) => {
                let mut lookahead = ctx.stream.clone();
                let name = NameString::parse(&mut lookahead)?;
                let path = self
                    .namespace
                    .read()
                    .lookup(&ctx.scope, &name, LookupMode::Search)?;
                let is_method = matches!(self.namespace.read().get(&path), Some(Object::Method(_)));
                if is_method {
                    Ok(temporary_or_reference(self.eval_term_arg(ctx)?))
                } else {
                    ctx.stream = lookahead;
                    Ok(Reference::Named(path))
                }
            }
            _ => Ok(temporary_or_reference(self.eval_term_arg(ctx)?)),
        }
    }

    /// Stores `value` into an optional target.
    pub(crate) fn store_target(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        target: Option<Reference>,
        value: &Object,
    ) -> Result<(), AmlError> {
        match target {
            Some(target) => self.store(ctx.frame, &target, value.clone()),
            None => Ok(()),
        }
    }

    // ─── Named objects ─────────────────────────────────────────────────────

    /// Adds `object` to the namespace on behalf of the running frame.
    pub(crate) fn add_object(
        &self,
        frame: &mut Frame,
        path: AmlPath,
        object: Object,
    ) -> Result<(), AmlError> {
        self.namespace.write().insert(&path, object)?;
        frame.record_created(path);
        Ok(())
    }

    fn parse_def_name(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let name = NameString::parse(&mut ctx.stream)?;
        let path = name.resolve(&ctx.scope)?;
        let value = self.eval_term_arg(ctx)?;
        self.add_object(ctx.frame, path, value)
    }

    fn parse_def_scope(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Control, AmlError> {
        let mut body = pkg_length::split_body(&mut ctx.stream)?;
        let name = NameString::parse(&mut body)?;
        let path = self
            .namespace
            .read()
            .lookup(&ctx.scope, &name, LookupMode::Search)
            .map_err(|_| AmlError::InvalidScope(alloc::format!("{name}")))?;
        let mut inner = ctx.nested(body, path);
        self.run_term_list(&mut inner)
    }

    fn parse_def_scoped_object(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        ext: u8,
    ) -> Result<Control, AmlError> {
        let mut body = pkg_length::split_body(&mut ctx.stream)?;
        let name = NameString::parse(&mut body)?;
        let path = name.resolve(&ctx.scope)?;
        let object = match ext {
            EXT_DEVICE_OP => Object::Device,
            EXT_PROCESSOR_OP => Object::Processor(Processor {
                id: body.read_u8()?,
                pblk_address: body.read_u32()?,
                pblk_len: body.read_u8()?,
            }),
            EXT_POWER_RES_OP => Object::PowerResource(PowerResource {
                system_level: body.read_u8()?,
                resource_order: body.read_u16()?,
            }),
            _ => Object::ThermalZone,
        };
        self.add_object(ctx.frame, path, object)?;
        let mut inner = ctx.nested(body, path);
        self.run_term_list(&mut inner)
    }

    fn parse_def_method(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let mut body = pkg_length::split_body(&mut ctx.stream)?;
        let name = NameString::parse(&mut body)?;
        let path = name.resolve(&ctx.scope)?;
        let flags = MethodFlags::from_bits_retain(body.read_u8()?);
        let code: Arc<[u8]> = Arc::from(body.remaining());
        self.add_object(
            ctx.frame,
            path,
            Object::Method(Method {
                flags,
                code: MethodCode::Aml(code),
            }),
        )
    }

    fn parse_def_alias(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let source = NameString::parse(&mut ctx.stream)?;
        let alias = NameString::parse(&mut ctx.stream)?;
        let target = self
            .namespace
            .read()
            .lookup(&ctx.scope, &source, LookupMode::Search)?;
        let path = alias.resolve(&ctx.scope)?;
        self.add_object(ctx.frame, path, Object::Alias(target))
    }

    fn parse_def_mutex(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let name = NameString::parse(&mut ctx.stream)?;
        let sync_level = ctx.stream.read_u8()? & 0x0F;
        let path = name.resolve(&ctx.scope)?;
        self.add_object(
            ctx.frame,
            path,
            Object::Mutex(Arc::new(AmlMutex::new(sync_level))),
        )
    }

    fn parse_def_event(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let name = NameString::parse(&mut ctx.stream)?;
        let path = name.resolve(&ctx.scope)?;
        self.add_object(ctx.frame, path, Object::Event(Arc::new(AmlEvent::new())))
    }

    fn parse_def_op_region(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let name = NameString::parse(&mut ctx.stream)?;
        let space = RegionSpace::from(ctx.stream.read_u8()?);
        let offset = self.eval_integer(ctx)?;
        let length = self.eval_integer(ctx)?;
        let path = name.resolve(&ctx.scope)?;
        let region = OpRegion {
            space,
            offset,
            length,
            scope: path.parent().unwrap_or(AmlPath::ROOT),
        };
        self.add_object(ctx.frame, path, Object::OpRegion(region))
    }

    fn parse_def_data_region(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let name = NameString::parse(&mut ctx.stream)?;
        for _ in 0..3 {
            self.eval_operand(ctx)?;
        }
        log::warn!("aml: DataTableRegion {name} in {} not supported", ctx.scope);
        Ok(())
    }

    fn parse_def_field(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let mut body = pkg_length::split_body(&mut ctx.stream)?;
        let region = NameString::parse(&mut body)?;
        let region = self
            .namespace
            .read()
            .lookup(&ctx.scope, &region, LookupMode::Search)?;
        let rules = FieldRules::from_flags(body.read_u8()?)?;
        let scope = ctx.scope;
        let mut list = ctx.nested(body, scope);
        self.parse_field_list(&mut list, &FieldKind::Normal { region }, rules)
    }

    fn parse_def_index_field(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let mut body = pkg_length::split_body(&mut ctx.stream)?;
        let index = NameString::parse(&mut body)?;
        let data = NameString::parse(&mut body)?;
        let (index, data) = {
            let namespace = self.namespace.read();
            (
                namespace.lookup(&ctx.scope, &index, LookupMode::Search)?,
                namespace.lookup(&ctx.scope, &data, LookupMode::Search)?,
            )
        };
        let rules = FieldRules::from_flags(body.read_u8()?)?;
        let scope = ctx.scope;
        let mut list = ctx.nested(body, scope);
        self.parse_field_list(&mut list, &FieldKind::Index { index, data }, rules)
    }

    fn parse_def_bank_field(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let mut body = pkg_length::split_body(&mut ctx.stream)?;
        let region = NameString::parse(&mut body)?;
        let bank = NameString::parse(&mut body)?;
        let (region, bank) = {
            let namespace = self.namespace.read();
            (
                namespace.lookup(&ctx.scope, &region, LookupMode::Search)?,
                namespace.lookup(&ctx.scope, &bank, LookupMode::Search)?,
            )
        };
        let scope = ctx.scope;
        let mut list = ctx.nested(body, scope);
        let bank_value = self.eval_integer(&mut list)?;
        let rules = FieldRules::from_flags(list.stream.read_u8()?)?;
        let kind = FieldKind::Bank {
            region,
            bank,
            bank_value,
        };
        self.parse_field_list(&mut list, &kind, rules)
    }

    /// Declares the field units of a `FieldList`.
    fn parse_field_list(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        kind: &FieldKind,
        mut rules: FieldRules,
    ) -> Result<(), AmlError> {
        let mut bit_offset = 0u64;
        while !ctx.stream.is_empty() {
            match ctx.stream.peek()? {
                RESERVED_FIELD => {
                    ctx.stream.skip(1)?;
                    bit_offset += pkg_length::decode_field_length(&mut ctx.stream)?;
                }
                ACCESS_FIELD => {
                    ctx.stream.skip(1)?;
                    let access_type = ctx.stream.read_u8()?;
                    let attrib = ctx.stream.read_u8()?;
                    if attrib != 0 {
                        log::warn!("aml: AccessAs attribute {attrib:#x} in {} not honored", ctx.scope);
                    }
                    rules = rules.with_access(access_type, attrib, 0)?;
                }
                EXTENDED_ACCESS_FIELD => {
                    ctx.stream.skip(1)?;
                    let access_type = ctx.stream.read_u8()?;
                    let attrib = ctx.stream.read_u8()?;
                    let length = ctx.stream.read_u8()?;
                    rules = rules.with_access(access_type, attrib, length)?;
                }
                CONNECT_FIELD => {
                    ctx.stream.skip(1)?;
                    if ctx.stream.peek()? == BUFFER_OP {
                        self.eval_term_arg(ctx)?;
                    } else {
                        NameString::parse(&mut ctx.stream)?;
                    }
                    log::warn!("aml: Connection() in {} ignored", ctx.scope);
                }
                _ => {
                    let seg = NameSeg::parse(&mut ctx.stream)?;
                    let bit_length = pkg_length::decode_field_length(&mut ctx.stream)?;
                    let path = ctx.scope.join(seg)?;
                    let field = FieldUnit {
                        kind: kind.clone(),
                        bit_offset,
                        bit_length,
                        rules,
                    };
                    self.add_object(ctx.frame, path, Object::FieldUnit(field))?;
                    bit_offset += bit_length;
                }
            }
        }
        Ok(())
    }

    /// `CreateBitField` .. `CreateQWordField` and `CreateField`, opcode
    /// already consumed.
    fn parse_create_field(&self, ctx: &mut ParseContext<'_, '_>, op: u8) -> Result<(), AmlError> {
        let source = self.parse_source(ctx)?;
        let index = self.eval_integer(ctx)?;
        let byte_index = || {
            index.checked_mul(8).ok_or(AmlError::IndexOutOfBounds {
                index,
                len: u64::MAX / 8,
            })
        };
        let (bit_offset, bit_length) = match op {
            CREATE_BIT_FIELD_OP => (index, 1),
            CREATE_BYTE_FIELD_OP => (byte_index()?, 8),
            CREATE_WORD_FIELD_OP => (byte_index()?, 16),
            CREATE_DWORD_FIELD_OP => (byte_index()?, 32),
            CREATE_QWORD_FIELD_OP => (byte_index()?, 64),
            _ => (index, self.eval_integer(ctx)?),
        };
        let name = NameString::parse(&mut ctx.stream)?;
        let path = name.resolve(&ctx.scope)?;
        self.add_object(
            ctx.frame,
            path,
            Object::BufferField(BufferField {
                source,
                bit_offset,
                bit_length,
            }),
        )
    }

    // ─── Control flow ──────────────────────────────────────────────────────

    /// `If` (and a following `Else`), opcode already consumed.
    fn parse_if(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Control, AmlError> {
        let body = pkg_length::split_body(&mut ctx.stream)?;
        let scope = ctx.scope;
        let (taken, result) = {
            let mut inner = ctx.nested(body, scope);
            let taken = self.eval_integer(&mut inner)? != 0;
            let result = if taken {
                self.run_term_list(&mut inner)?
            } else {
                Control::Normal
            };
            (taken, result)
        };

        if ctx.stream.peek() == Ok(ELSE_OP) {
            ctx.stream.skip(1)?;
            let else_body = pkg_length::split_body(&mut ctx.stream)?;
            if !taken {
                let mut inner = ctx.nested(else_body, scope);
                return self.run_term_list(&mut inner);
            }
        }
        Ok(result)
    }

    /// `While`, opcode already consumed.
    fn parse_while(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Control, AmlError> {
        let body = pkg_length::split_body(&mut ctx.stream)?;
        ctx.frame.loop_depth += 1;
        let result = self.run_loop(ctx, &body);
        ctx.frame.loop_depth -= 1;
        result
    }

    fn run_loop(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        body: &AmlStream<'_>,
    ) -> Result<Control, AmlError> {
        let scope = ctx.scope;
        let mut iterations = 0u64;
        loop {
            let mut inner = ctx.nested(body.clone(), scope);
            if self.eval_integer(&mut inner)? == 0 {
                return Ok(Control::Normal);
            }
            iterations += 1;
            if iterations > self.config.max_loop_iterations {
                return Err(AmlError::LoopLimitExceeded);
            }
            match self.run_term_list(&mut inner)? {
                Control::Normal | Control::Continue => {}
                Control::Break => return Ok(Control::Normal),
                ret @ Control::Return(_) => return Ok(ret),
            }
        }
    }
}

/// Wraps an evaluated operand as a location: references stay references,
/// plain values become temporaries.
fn temporary_or_reference(value: Object) -> Reference {
    match value {
        Object::Reference(reference) => reference,
        other => Reference::Temporary(alloc::boxed::Box::new(other)),
    }
}

/// Reads a NUL-terminated ASCII `String` literal (prefix already consumed).
fn parse_string(stream: &mut AmlStream<'_>) -> Result<String, AmlError> {
    let bytes = stream.remaining();
    let len = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(AmlError::InvalidString)?;
    let text = &bytes[..len];
    if !text.is_ascii() {
        return Err(AmlError::InvalidString);
    }
    let out = text.iter().map(|&b| char::from(b)).collect();
    stream.skip(len + 1)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal() {
        let mut s = AmlStream::new(b"ABC\0\x01");
        assert_eq!(parse_string(&mut s).unwrap(), "ABC");
        assert_eq!(s.read_u8(), Ok(1));
    }

    #[test]
    fn unterminated_string_fails() {
        let mut s = AmlStream::new(b"ABC");
        assert_eq!(parse_string(&mut s), Err(AmlError::InvalidString));
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn non_ascii_string_fails() {
        let mut s = AmlStream::new(&[b'A', 0xC3, 0]);
        assert_eq!(parse_string(&mut s), Err(AmlError::InvalidString));
    }
}
