//! Bundled native functions
//!
//! Every native pushes exactly one result; procedures push `null`.

use super::errors::{InternalError, VmError};
use super::types::{Primitive, Value};
use super::vm::{Runtime, RuntimeBuilder};

pub fn register(builder: RuntimeBuilder) -> RuntimeBuilder {
    builder
        .native("length", ["X"], length)
        .native("append", ["L", "X"], append)
        .native("str", ["X"], to_str)
}

/// Destructure arguments whose count was already checked by `invoke`
fn args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], VmError> {
    args.try_into().map_err(|args: Vec<Value>| {
        InternalError::Arity {
            function: name.to_string(),
            expected: N,
            got: args.len(),
        }
        .into()
    })
}

/// `length(X)`: number of list items or string characters
fn length(runtime: &mut Runtime, argv: Vec<Value>) -> Result<(), VmError> {
    let [value] = args("length", argv)?;
    let len = match &value {
        Value::Primitive(Primitive::Str(s)) => s.chars().count(),
        Value::Reference(_) => value.with_list(|items| items.len())?,
        Value::Primitive(_) => {
            return Err(VmError::type_error(format!(
                "Type '{}' has no length",
                value.type_name()
            )))
        }
    };
    let len = i64::try_from(len).map_err(|_| VmError::math_error("Length does not fit an integer"))?;
    runtime.push(&Value::integer(len));
    Ok(())
}

/// `append(L, X)`: add X to the end of L in place
fn append(runtime: &mut Runtime, argv: Vec<Value>) -> Result<(), VmError> {
    let [list, value] = args("append", argv)?;
    list.with_list(|items| items.push(value.copy()))?;
    runtime.push(&Value::null());
    Ok(())
}

/// `str(X)`: display form of X
fn to_str(runtime: &mut Runtime, argv: Vec<Value>) -> Result<(), VmError> {
    let [value] = args("str", argv)?;
    runtime.push(&Value::string(value.to_string()));
    Ok(())
}
