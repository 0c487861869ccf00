//! Control method invocation.
//!
//! Every invocation runs in a fresh [`Frame`] with the method's own path as
//! the parse scope. Named objects the body creates are recorded in the frame
//! and removed, newest first, when the invocation ends, however it ends.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;

use crate::Interpreter;
use crate::context::{Control, Frame, ParseContext};
use crate::error::AmlError;
use crate::handler::Handler;
use crate::name::AmlPath;
use crate::object::{Method, MethodCode, Object, Reference};
use crate::stream::AmlStream;

impl<H: Handler> Interpreter<H> {
    /// Invokes `method` (found at `path`) with `args` at nesting `depth`.
    ///
    /// Returns the `Return` value, or [`Object::Uninitialized`] if the body
    /// ran to its end.
    pub(crate) fn invoke(
        &self,
        path: &AmlPath,
        method: &Method,
        args: Vec<Object>,
        depth: usize,
    ) -> Result<Object, AmlError> {
        let expected = method.arg_count();
        if args.len() != usize::from(expected) {
            return Err(AmlError::ArgumentCount {
                expected,
                found: args.len(),
            });
        }
        if depth > self.config.max_call_depth {
            log::warn!("aml: call depth limit reached invoking {path}");
            return Err(AmlError::CallDepthExceeded);
        }
        log::trace!("aml: invoke {path} ({} args, depth {depth})", args.len());

        let code = match &method.code {
            MethodCode::Native(native) => return native(&args),
            MethodCode::Aml(code) => code,
        };

        let mut frame = Frame::method(args, depth);
        let result = {
            let mut ctx = ParseContext::new(AmlStream::new(code), *path, &mut frame);
            self.run_term_list(&mut ctx)
        };
        let outcome = match result {
            Ok(Control::Return(value)) => self.detach(&frame, value),
            Ok(Control::Normal) => Ok(Object::Uninitialized),
            Ok(Control::Break | Control::Continue) => {
                debug_assert!(false, "loop control escaped {path}");
                Err(AmlError::BreakOutsideLoop)
            }
            Err(err) => Err(err),
        };
        self.teardown(&mut frame);

        match &outcome {
            Ok(_) => log::trace!("aml: {path} returned"),
            Err(err) => log::debug!("aml: {path} failed: {err}"),
        }
        outcome
    }

    /// Removes the namespace objects the invocation created.
    fn teardown(&self, frame: &mut Frame) {
        let created = frame.take_created();
        if created.is_empty() {
            return;
        }
        let mut namespace = self.namespace.write();
        for path in created.iter().rev() {
            namespace.remove(path);
        }
    }

    /// Makes `value` safe to leave `frame`: references into the frame's
    /// locals and arguments are replaced by a copy of what they point at.
    pub(crate) fn detach(&self, frame: &Frame, value: Object) -> Result<Object, AmlError> {
        match value {
            Object::Reference(reference) if reference.is_frame_relative() => {
                let target = self.read_reference(frame, &reference)?;
                Ok(Object::Reference(Reference::Temporary(Box::new(target))))
            }
            other => Ok(other),
        }
    }

    /// Evaluates the object at `path` on behalf of a caller at `depth`.
    pub(crate) fn evaluate_at_depth(
        &self,
        path: &AmlPath,
        args: Vec<Object>,
        depth: usize,
    ) -> Result<Object, AmlError> {
        let (path, object) = {
            let namespace = self.namespace.read();
            let path = namespace.resolve_alias(path)?;
            let object = namespace
                .get(&path)
                .cloned()
                .ok_or_else(|| AmlError::ObjectNotFound(format!("{path}")))?;
            (path, object)
        };
        if !args.is_empty() && !matches!(object, Object::Method(_)) {
            return Err(AmlError::ArgumentCount {
                expected: 0,
                found: args.len(),
            });
        }
        match object {
            Object::Method(method) => self.invoke(&path, &method, args, depth + 1),
            Object::FieldUnit(field) => self.read_field(&field),
            Object::BufferField(field) => self.read_buffer_field(&Frame::table(), &field),
            other => Ok(other),
        }
    }
}
