//! Reference instruction set
//!
//! A small stack-machine instruction set that implements `Operation`.
//! Instructions serialize as `{"line": 3, "op": "push", "value": 1}`, which
//! is the format of program files.

use serde::{Deserialize, Serialize};

use super::errors::VmError;
use super::operators;
use super::types::{BinaryOp, Frame, Operation, Primitive, UnaryOp, Value};
use super::vm::Runtime;

/// Which variable map `load`/`store` address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The executing frame's locals
    #[default]
    Local,
    /// The outermost frame's locals
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instr {
    /// Push a primitive constant
    Push { value: Primitive },
    /// Pop `len` values and push a new list holding them in order
    List { len: usize },
    Load {
        name: String,
        #[serde(default)]
        scope: Scope,
    },
    Store {
        name: String,
        #[serde(default)]
        scope: Scope,
    },
    /// Discard the top of the stack
    Pop,
    Binary { operator: BinaryOp },
    Unary { operator: UnaryOp },
    /// Pop index and target, push `target[index]`
    Index,
    Jump { target: usize },
    /// Pop a boolean and jump when it is false
    JumpIfFalse { target: usize },
    /// Pop `argc` arguments and invoke `name`
    Call { name: String, argc: usize },
    /// Finish the executing frame
    Return,
    /// Pause when running in debug mode
    Breakpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    pub line: usize,
    #[serde(flatten)]
    pub instr: Instr,
}

impl Op {
    pub fn new(line: usize, instr: Instr) -> Self {
        Op { line, instr }
    }
}

fn undefined(name: &str) -> VmError {
    VmError::name_error(format!("Variable '{name}' is not defined"))
}

impl Operation for Op {
    fn line(&self) -> usize {
        self.line
    }

    fn execute(&self, runtime: &mut Runtime, frame: &mut Frame) -> Result<(), VmError> {
        match &self.instr {
            Instr::Push { value } => {
                runtime.push(&Value::Primitive(value.clone()));
            }
            Instr::List { len } => {
                let items = runtime.pop_n(*len)?;
                runtime.push(&Value::list(items));
            }
            Instr::Load { name, scope } => {
                let locals = match scope {
                    Scope::Local => frame.locals(),
                    Scope::Global => runtime.global_locals(frame),
                };
                let value = locals.get(name).cloned().ok_or_else(|| undefined(name))?;
                runtime.push(&value);
            }
            Instr::Store { name, scope } => {
                let value = runtime.pop()?;
                let locals = match scope {
                    Scope::Local => frame.locals_mut(),
                    Scope::Global => runtime.global_locals_mut(frame),
                };
                locals.insert(name.clone(), value);
            }
            Instr::Pop => {
                runtime.pop()?;
            }
            Instr::Binary { operator } => {
                let right = runtime.pop()?;
                let left = runtime.pop()?;
                runtime.push(&operators::binary(*operator, &left, &right)?);
            }
            Instr::Unary { operator } => {
                let operand = runtime.pop()?;
                runtime.push(&operators::unary(*operator, &operand)?);
            }
            Instr::Index => {
                let index = runtime.pop()?;
                let target = runtime.pop()?;
                runtime.push(&operators::index(&target, &index)?);
            }
            Instr::Jump { target } => frame.jump(*target)?,
            Instr::JumpIfFalse { target } => {
                if !runtime.pop()?.as_bool()? {
                    frame.jump(*target)?;
                }
            }
            Instr::Call { name, argc } => {
                let args = runtime.pop_n(*argc)?;
                runtime.call(name, args)?;
            }
            Instr::Return => frame.finish(),
            Instr::Breakpoint => runtime.pause(self.line),
        }
        Ok(())
    }
}
