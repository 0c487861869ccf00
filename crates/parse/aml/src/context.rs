//! Parse state threaded through the term parser.

use alloc::vec::Vec;

use crate::error::AmlError;
use crate::name::AmlPath;
use crate::object::Object;
use crate::stream::AmlStream;

/// Number of `ArgX` slots.
pub const ARG_COUNT: usize = 7;
/// Number of `LocalX` slots.
pub const LOCAL_COUNT: usize = 8;

/// Per-invocation state: arguments, locals and the objects the invocation
/// created in the namespace.
///
/// Table loads run in a frame with no arguments that is not a method frame;
/// objects created there are permanent.
#[derive(Debug, Default)]
pub struct Frame {
    args: [Object; ARG_COUNT],
    locals: [Object; LOCAL_COUNT],
    created: Vec<AmlPath>,
    in_method: bool,
    depth: usize,
    pub(crate) loop_depth: usize,
}

impl Frame {
    /// A frame for loading a definition block.
    #[must_use]
    pub fn table() -> Self {
        Self::default()
    }

    /// A frame for a method invocation at nesting `depth`.
    #[must_use]
    pub fn method(args: Vec<Object>, depth: usize) -> Self {
        let mut frame = Self {
            in_method: true,
            depth,
            ..Self::default()
        };
        for (slot, arg) in frame.args.iter_mut().zip(args) {
            *slot = arg;
        }
        frame
    }

    /// Whether this frame belongs to a method invocation.
    #[must_use]
    pub fn in_method(&self) -> bool {
        self.in_method
    }

    /// Method nesting depth (0 for table loads).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Reads `LocalN`.
    pub fn local(&self, n: u8) -> Result<&Object, AmlError> {
        match self.locals.get(usize::from(n)) {
            Some(Object::Uninitialized) | None => Err(AmlError::UninitializedLocal(n)),
            Some(object) => Ok(object),
        }
    }

    /// Reads `ArgN`.
    pub fn arg(&self, n: u8) -> Result<&Object, AmlError> {
        match self.args.get(usize::from(n)) {
            Some(Object::Uninitialized) | None => Err(AmlError::UninitializedArg(n)),
            Some(object) => Ok(object),
        }
    }

    /// Returns the storage of `LocalN`.
    pub fn local_mut(&mut self, n: u8) -> Result<&mut Object, AmlError> {
        self.locals
            .get_mut(usize::from(n))
            .ok_or(AmlError::UninitializedLocal(n))
    }

    /// Returns the storage of `ArgN`.
    pub fn arg_mut(&mut self, n: u8) -> Result<&mut Object, AmlError> {
        self.args
            .get_mut(usize::from(n))
            .ok_or(AmlError::UninitializedArg(n))
    }

    /// Records a namespace object created by this invocation.
    pub fn record_created(&mut self, path: AmlPath) {
        if self.in_method {
            self.created.push(path);
        }
    }

    /// Takes the created-object list, most recent last.
    pub fn take_created(&mut self) -> Vec<AmlPath> {
        core::mem::take(&mut self.created)
    }
}

/// What a term did to control flow.
#[derive(Debug, Clone)]
pub enum Control {
    /// Continue with the next term.
    Normal,
    /// `Return` executed with this value.
    Return(Object),
    /// `Break` executed.
    Break,
    /// `Continue` executed.
    Continue,
}

/// The input to [`Interpreter::parse_object`](crate::Interpreter::parse_object):
/// the bytes still to parse, the scope names resolve against, and the frame
/// of the running invocation.
#[derive(Debug)]
pub struct ParseContext<'s, 'f> {
    /// Remaining bytecode of the current term list.
    pub stream: AmlStream<'s>,
    /// Current scope.
    pub scope: AmlPath,
    /// The frame of the running method (or table load).
    pub frame: &'f mut Frame,
}

impl<'s, 'f> ParseContext<'s, 'f> {
    /// Creates a context.
    pub fn new(stream: AmlStream<'s>, scope: AmlPath, frame: &'f mut Frame) -> Self {
        Self {
            stream,
            scope,
            frame,
        }
    }

    /// A context over `stream` in `scope` sharing this context's frame, for
    /// package bodies (`Scope`, `Device`, `If`, `While`, ...).
    pub fn nested<'t>(&mut self, stream: AmlStream<'t>, scope: AmlPath) -> ParseContext<'t, '_> {
        ParseContext {
            stream,
            scope,
            frame: &mut *self.frame,
        }
    }
}
