//! Bytecode operation contract

use std::fmt;
use std::sync::Arc;

use super::super::errors::VmError;
use super::super::vm::Runtime;
use super::frame::Frame;

/// One executable instruction
///
/// `execute` receives the frame it belongs to separately from the runtime:
/// while an operation runs, its frame is detached from the frame stack.
pub trait Operation: fmt::Debug + Send + Sync {
    fn execute(&self, runtime: &mut Runtime, frame: &mut Frame) -> Result<(), VmError>;

    /// Source line this operation was generated from
    fn line(&self) -> usize;
}

/// Code of a function, shared between the function table and its frames
pub type Code = Arc<[Box<dyn Operation>]>;
