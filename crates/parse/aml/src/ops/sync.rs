//! Synchronization operators and the statements that only report to the
//! host (`Notify`, `Fatal`).

use alloc::sync::Arc;

use crate::Interpreter;
use crate::context::{Frame, ParseContext};
use crate::error::AmlError;
use crate::handler::Handler;
use crate::object::{Object, ObjectType, Reference};
use crate::sync::{AmlEvent, AmlMutex, WAIT_FOREVER, WaitStatus};

impl<H: Handler> Interpreter<H> {
    /// `Acquire(SyncObject, TimeoutValue)`: `Zero` once owned, `Ones` on
    /// timeout.
    pub(super) fn eval_acquire(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let target = self.parse_super_name(ctx)?;
        let timeout = ctx.stream.read_u16()?;
        let mutex = self.mutex_at(ctx.frame, &target)?;
        let status = mutex.acquire(&self.handler, timeout);
        if status == WaitStatus::TimedOut {
            log::debug!("aml: Acquire in {} timed out after {timeout} ms", ctx.scope);
        }
        Ok(self.boolean(status == WaitStatus::TimedOut))
    }

    /// `Release(SyncObject)`.
    pub(super) fn exec_release(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let target = self.parse_super_name(ctx)?;
        self.mutex_at(ctx.frame, &target)?.release(&self.handler)
    }

    /// `Signal(SyncObject)`.
    pub(super) fn exec_signal(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let target = self.parse_super_name(ctx)?;
        self.event_at(ctx.frame, &target)?.signal(&self.handler);
        Ok(())
    }

    /// `Reset(SyncObject)`.
    pub(super) fn exec_reset(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let target = self.parse_super_name(ctx)?;
        self.event_at(ctx.frame, &target)?.reset();
        Ok(())
    }

    /// `Wait(SyncObject, TimeoutValue)`: `Zero` once signaled, `Ones` on
    /// timeout.
    pub(super) fn eval_wait(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let target = self.parse_super_name(ctx)?;
        let timeout = self.eval_integer(ctx)?;
        let timeout = u16::try_from(timeout).unwrap_or(WAIT_FOREVER);
        let event = self.event_at(ctx.frame, &target)?;
        let status = event.wait(&self.handler, timeout);
        Ok(self.boolean(status == WaitStatus::TimedOut))
    }

    /// `Fatal(Type, Code, Arg)`: aborts the running evaluation.
    pub(super) fn exec_fatal(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let kind = ctx.stream.read_u8()?;
        let code = ctx.stream.read_u32()?;
        let arg = self.eval_integer(ctx)?;
        log::error!("aml: Fatal({kind:#x}, {code:#x}, {arg:#x}) in {}", ctx.scope);
        Err(AmlError::Fatal { kind, code, arg })
    }

    /// `Notify(NotifyObject, NotifyValue)`. Nothing is delivered.
    pub(crate) fn exec_notify(&self, ctx: &mut ParseContext<'_, '_>) -> Result<(), AmlError> {
        let target = self.parse_super_name(ctx)?;
        let value = self.eval_integer(ctx)?;
        match target {
            Reference::Named(path) => log::warn!("aml: Notify({path}, {value:#x}) dropped"),
            other => log::warn!("aml: Notify({other:?}, {value:#x}) dropped"),
        }
        Ok(())
    }

    fn sync_object(&self, frame: &Frame, target: &Reference) -> Result<Object, AmlError> {
        match self.read_reference(frame, target)? {
            Object::Reference(inner) => self.read_reference(frame, &inner),
            other => Ok(other),
        }
    }

    fn mutex_at(&self, frame: &Frame, target: &Reference) -> Result<Arc<AmlMutex>, AmlError> {
        match self.sync_object(frame, target)? {
            Object::Mutex(mutex) => Ok(mutex),
            other => Err(AmlError::invalid_type(
                ObjectType::Mutex,
                other.object_type(),
            )),
        }
    }

    fn event_at(&self, frame: &Frame, target: &Reference) -> Result<Arc<AmlEvent>, AmlError> {
        match self.sync_object(frame, target)? {
            Object::Event(event) => Ok(event),
            other => Err(AmlError::invalid_type(
                ObjectType::Event,
                other.object_type(),
            )),
        }
    }
}
