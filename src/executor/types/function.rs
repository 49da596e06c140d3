//! Function table entries

use std::fmt;
use std::sync::Arc;

use super::super::errors::VmError;
use super::super::vm::Runtime;
use super::operation::{Code, Operation};
use super::values::Value;

/// Host callback backing a native function. It receives the runtime and the
/// arguments, and must push exactly one result.
pub type NativeCallback = Arc<dyn Fn(&mut Runtime, Vec<Value>) -> Result<(), VmError> + Send + Sync>;

/// Interpreted function as supplied by a code generator or program file
#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub code: Vec<Box<dyn Operation>>,
}

impl FunctionDef {
    pub fn new<O, P>(name: impl Into<String>, params: P, code: Vec<O>) -> Self
    where
        O: Operation + 'static,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        FunctionDef {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            code: code
                .into_iter()
                .map(|op| Box::new(op) as Box<dyn Operation>)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterpretedFunction {
    pub name: String,
    pub params: Vec<String>,
    pub code: Code,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub params: Vec<String>,
    pub callback: NativeCallback,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    Interpreted(InterpretedFunction),
    Native(NativeFunction),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Interpreted(f) => &f.name,
            Function::Native(f) => &f.name,
        }
    }

    pub fn params(&self) -> &[String] {
        match self {
            Function::Interpreted(f) => &f.params,
            Function::Native(f) => &f.params,
        }
    }

    pub fn arity(&self) -> usize {
        self.params().len()
    }
}

impl From<FunctionDef> for Function {
    fn from(def: FunctionDef) -> Self {
        Function::Interpreted(InterpretedFunction {
            name: def.name,
            params: def.params,
            code: Code::from(def.code),
        })
    }
}
