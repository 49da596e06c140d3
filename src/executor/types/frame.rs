//! Activation frames

use std::collections::HashMap;

use super::super::errors::{InternalError, VmError};
use super::operation::Code;
use super::values::Value;

pub type Locals = HashMap<String, Value>;

/// One function activation
///
/// `prev_pc` is the index of the operation currently (or last) executing.
/// Error reports use it because `pc` has already moved on by the time an
/// operation can fail.
#[derive(Debug)]
pub struct Frame {
    pub(crate) function: String,
    pub(crate) code: Code,
    pub(crate) pc: usize,
    pub(crate) prev_pc: usize,
    pub(crate) locals: Locals,
    pub(crate) finished: bool,
}

impl Frame {
    pub fn new(function: impl Into<String>, code: Code, locals: Locals) -> Self {
        Frame {
            function: function.into(),
            code,
            pc: 0,
            prev_pc: 0,
            locals,
            finished: false,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn prev_pc(&self) -> usize {
        self.prev_pc
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut Locals {
        &mut self.locals
    }

    /// Set the next operation to execute. Jumping to the end of the code
    /// finishes the frame on the next step.
    pub fn jump(&mut self, target: usize) -> Result<(), VmError> {
        if target > self.code.len() {
            return Err(InternalError::BadJump {
                function: self.function.clone(),
                target,
                len: self.code.len(),
            }
            .into());
        }
        self.pc = target;
        Ok(())
    }

    /// Mark the frame for removal once the current operation completes
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_exhausted(&self) -> bool {
        self.pc >= self.code.len()
    }

    /// Line of the previously executed operation
    pub fn previous_line(&self) -> Option<usize> {
        self.code.get(self.prev_pc).map(|op| op.line())
    }
}
