//! Core types for the parser and the execution engine

pub mod ast;
pub mod frame;
pub mod function;
pub mod operation;
pub mod values;

pub use ast::{BinaryOp, Expr, Literal, Program, Stmt, UnaryOp};
pub use frame::{Frame, Locals};
pub use function::{Function, FunctionDef, InterpretedFunction, NativeCallback, NativeFunction};
pub use operation::{Code, Operation};
pub use values::{Expected, Object, Primitive, Reference, Value, ValueType};
