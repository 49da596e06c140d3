//! Runtime state
//!
//! The runtime holds all execution state:
//! - frames: stack of function activations (the outermost one holds globals)
//! - stack: operand stack shared by all frames
//! - functions: the function table, interpreted and native
//! - debug state and the handle used to notify the host

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::debug::{DebugHandle, LogHandle};
use super::errors::{InternalError, Report, VmError};
use super::stdlib;
use super::types::{Frame, Function, FunctionDef, Locals, NativeFunction, Value};

/* ===================== States ===================== */

/// Debugger state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DebugState {
    Running,
    Paused,
}

/// Where the runtime is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    /// Built, no entry frame yet
    Ready,
    Running,
    Finished,
    /// Stopped by an error
    Halted,
}

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Frame stack is empty
    Done,
}

/// Why a batch of steps ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Quota used up, more work remains
    Yielded,
    Paused,
    Finished,
    Halted,
    /// The host stopped the scheduler
    Stopped,
}

/// Snapshot of visible variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variables {
    pub global: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<BTreeMap<String, Value>>,
}

fn snapshot(locals: &Locals) -> BTreeMap<String, Value> {
    locals
        .iter()
        .map(|(name, value)| (name.clone(), value.copy()))
        .collect()
}

/* ===================== Runtime ===================== */

pub struct Runtime {
    pub(crate) frames: Vec<Frame>,
    pub(crate) stack: Vec<Value>,
    pub(crate) functions: HashMap<String, Arc<Function>>,
    pub(crate) debug_mode: bool,
    pub(crate) state: DebugState,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) handle: Box<dyn DebugHandle>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("frames", &self.frames.len())
            .field("stack", &self.stack)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("debug_mode", &self.debug_mode)
            .field("state", &self.state)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Runtime over `functions` with no natives, debug mode off and a
    /// logging handle
    pub fn new(functions: Vec<FunctionDef>) -> Self {
        Self::builder(functions).build()
    }

    pub fn builder(functions: Vec<FunctionDef>) -> RuntimeBuilder {
        RuntimeBuilder::new(functions)
    }

    /* ---------- function table ---------- */

    pub fn function(&self, name: &str) -> Result<Arc<Function>, VmError> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| InternalError::UnknownFunction(name.to_string()).into())
    }

    /// Invoke `function` with `args`. Interpreted functions get a new frame
    /// with their parameters bound; natives run immediately.
    pub fn invoke(&mut self, function: &Function, args: Vec<Value>) -> Result<(), VmError> {
        if args.len() != function.arity() {
            return Err(InternalError::Arity {
                function: function.name().to_string(),
                expected: function.arity(),
                got: args.len(),
            }
            .into());
        }

        match function {
            Function::Interpreted(f) => {
                let locals: Locals = f.params.iter().cloned().zip(args).collect();
                debug!(function = %f.name, depth = self.frames.len(), "push frame");
                self.frames
                    .push(Frame::new(f.name.clone(), Arc::clone(&f.code), locals));
                Ok(())
            }
            Function::Native(f) => {
                debug!(function = %f.name, "call native");
                (f.callback)(self, args)
            }
        }
    }

    /// Look up `name` and invoke it
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<(), VmError> {
        let function = self.function(name)?;
        self.invoke(&function, args)
    }

    /* ---------- operand stack ---------- */

    /// Push a copy of `value`
    pub fn push(&mut self, value: &Value) {
        self.stack.push(value.copy());
    }

    pub fn pop(&mut self) -> Result<Value, VmError> {
        self.stack
            .pop()
            .ok_or_else(|| InternalError::StackUnderflow.into())
    }

    /// Pop `n` values, returned in push order
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, VmError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(InternalError::StackUnderflow)?;
        Ok(self.stack.split_off(start))
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /* ---------- frames and scopes ---------- */

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Globals are the locals of the outermost frame. While an operation
    /// runs its frame is detached, so with an otherwise empty stack the
    /// executing frame is the outermost one.
    pub fn global_locals<'a>(&'a self, current: &'a Frame) -> &'a Locals {
        match self.frames.first() {
            Some(outer) => outer.locals(),
            None => current.locals(),
        }
    }

    pub fn global_locals_mut<'a>(&'a mut self, current: &'a mut Frame) -> &'a mut Locals {
        match self.frames.first_mut() {
            Some(outer) => outer.locals_mut(),
            None => current.locals_mut(),
        }
    }

    /// Global variables, plus the current frame's locals when it is not the
    /// outermost frame
    pub fn variables(&self) -> Variables {
        let global = self
            .frames
            .first()
            .map(|frame| snapshot(frame.locals()))
            .unwrap_or_default();
        let local = match self.frames.len() {
            0 | 1 => None,
            _ => self.frames.last().map(|frame| snapshot(frame.locals())),
        };
        Variables { global, local }
    }

    /* ---------- debugging ---------- */

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn state(&self) -> DebugState {
        self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_paused(&self) -> bool {
        self.state == DebugState::Paused
    }

    /// Pause at `line`. Ignored with a warning outside debug mode or when
    /// already paused.
    pub fn pause(&mut self, line: usize) {
        if !self.debug_mode {
            warn!(line, "pause requested outside debug mode, ignoring");
            return;
        }
        if self.state == DebugState::Paused {
            warn!(line, "pause requested while already paused, ignoring");
            return;
        }
        self.handle.handle_pause(line);
        self.state = DebugState::Paused;
        info!(line, "paused");
    }

    /// Resume a paused execution. Ignored with a warning when not paused.
    pub fn resume(&mut self) {
        if self.state != DebugState::Paused {
            warn!("resume requested while not paused, ignoring");
            return;
        }
        self.handle.handle_resume();
        self.state = DebugState::Running;
        info!("resumed");
    }

    /// Report for `err`, attributed to the current frame's previously
    /// executed operation
    pub(crate) fn report(&self, err: &VmError) -> Report {
        match err {
            VmError::Runtime { kind, message } => Report::runtime(
                *kind,
                message,
                self.current_frame().and_then(Frame::previous_line),
            ),
            VmError::Internal(_) => Report::internal(),
        }
    }
}

/* ===================== Builder ===================== */

/// Builder for `Runtime`
pub struct RuntimeBuilder {
    functions: Vec<FunctionDef>,
    natives: Vec<NativeFunction>,
    debug_mode: bool,
    handle: Option<Box<dyn DebugHandle>>,
}

impl RuntimeBuilder {
    pub fn new(functions: Vec<FunctionDef>) -> Self {
        RuntimeBuilder {
            functions,
            natives: Vec::new(),
            debug_mode: false,
            handle: None,
        }
    }

    /// Register a native function. The callback must push exactly one value.
    pub fn native<P, F>(mut self, name: impl Into<String>, params: P, callback: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        F: Fn(&mut Runtime, Vec<Value>) -> Result<(), VmError> + Send + Sync + 'static,
    {
        self.natives.push(NativeFunction {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            callback: Arc::new(callback),
        });
        self
    }

    /// Register the bundled natives (`length`, `append`, `str`)
    pub fn with_stdlib(self) -> Self {
        stdlib::register(self)
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    pub fn handle(mut self, handle: impl DebugHandle + 'static) -> Self {
        self.handle = Some(Box::new(handle));
        self
    }

    pub fn build(self) -> Runtime {
        let mut functions = HashMap::new();
        let entries = self
            .functions
            .into_iter()
            .map(Function::from)
            .chain(self.natives.into_iter().map(Function::Native));
        for function in entries {
            let name = function.name().to_string();
            if functions.insert(name.clone(), Arc::new(function)).is_some() {
                warn!(function = %name, "function defined twice, last definition wins");
            }
        }
        debug!(functions = functions.len(), debug_mode = self.debug_mode, "runtime built");

        Runtime {
            frames: Vec::new(),
            stack: Vec::new(),
            functions,
            debug_mode: self.debug_mode,
            state: DebugState::Running,
            lifecycle: Lifecycle::Ready,
            handle: self.handle.unwrap_or_else(|| Box::new(LogHandle)),
        }
    }
}
