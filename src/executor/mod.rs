//! Bytecode execution engine
//!
//! A stack-based runtime over a table of functions. Interpreted functions
//! are sequences of `Operation`s; natives are host callbacks.
//!
//! ## Architecture
//! - `vm`: runtime state, function invocation, debug state
//! - `exec_loop`: `step()` and the drivers built on it
//! - `scheduler`: cooperative tokio driver with host commands
//! - `instructions`: the reference instruction set
//! - `operators`: binary/unary/index semantics
//! - `stdlib`: bundled natives
//! - `debug`: handles notified on pause, resume, error and exit

pub mod debug;
pub mod errors;
pub mod exec_loop;
pub mod instructions;
pub mod operators;
pub mod scheduler;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

pub use debug::{ChannelHandle, DebugEvent, DebugHandle, LogHandle};
pub use errors::{ErrorKind, InternalError, Report, VmError};
pub use instructions::{Instr, Op, Scope};
pub use scheduler::{Scheduler, SchedulerExit, SchedulerHandle};
pub use types::{Frame, Function, FunctionDef, Operation, Primitive, Value, ValueType};
pub use vm::{DebugState, Lifecycle, Outcome, Runtime, RuntimeBuilder, Step, Variables};
