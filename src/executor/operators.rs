//! Operator semantics
//!
//! - Integer arithmetic is checked; overflow is a Math Error.
//! - Mixing integer and real promotes to real. `/` always yields a real.
//! - `div` and `mod` only accept integers.
//! - `==` compares primitives by value and references by identity.

use std::cmp::Ordering;

use super::errors::VmError;
use super::types::{BinaryOp, Object, Primitive, UnaryOp, Value};

/* ===================== Binary ===================== */

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, VmError> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            let (a, b) = numbers(op, left, right)?;
            if b == 0.0 {
                return Err(division_by_zero());
            }
            Ok(Value::real(a / b))
        }
        BinaryOp::IntDiv => integer_op(op, left, right, i64::checked_div),
        BinaryOp::Mod => integer_op(op, left, right, |a, b| Some(a.wrapping_rem(b))),

        BinaryOp::Eq => Ok(Value::boolean(equals(left, right))),
        BinaryOp::Ne => Ok(Value::boolean(!equals(left, right))),
        BinaryOp::Lt => compare(op, left, right, Ordering::is_lt),
        BinaryOp::Le => compare(op, left, right, Ordering::is_le),
        BinaryOp::Gt => compare(op, left, right, Ordering::is_gt),
        BinaryOp::Ge => compare(op, left, right, Ordering::is_ge),

        BinaryOp::And => Ok(Value::boolean(left.as_bool()? && right.as_bool()?)),
        BinaryOp::Or => Ok(Value::boolean(left.as_bool()? || right.as_bool()?)),
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> VmError {
    VmError::type_error(format!(
        "Operator '{}' cannot be applied to '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn division_by_zero() -> VmError {
    VmError::math_error("Division by zero")
}

fn overflow(op: &str) -> VmError {
    VmError::math_error(format!("Integer overflow in '{op}'"))
}

fn integers(left: &Value, right: &Value) -> Option<(i64, i64)> {
    match (left.as_primitive()?, right.as_primitive()?) {
        (Primitive::Integer(a), Primitive::Integer(b)) => Some((*a, *b)),
        _ => None,
    }
}

fn numbers(op: BinaryOp, left: &Value, right: &Value) -> Result<(f64, f64), VmError> {
    let a = left.as_primitive().and_then(Primitive::to_f64);
    let b = right.as_primitive().and_then(Primitive::to_f64);
    a.zip(b).ok_or_else(|| mismatch(op, left, right))
}

fn add(left: &Value, right: &Value) -> Result<Value, VmError> {
    if let (Some(Primitive::Str(a)), Some(Primitive::Str(b))) = (left.as_primitive(), right.as_primitive()) {
        return Ok(Value::string(format!("{a}{b}")));
    }
    arithmetic(BinaryOp::Add, left, right, i64::checked_add, |a, b| a + b)
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    real_op: fn(f64, f64) -> f64,
) -> Result<Value, VmError> {
    if let Some((a, b)) = integers(left, right) {
        return int_op(a, b)
            .map(Value::integer)
            .ok_or_else(|| overflow(op.symbol()));
    }
    let (a, b) = numbers(op, left, right)?;
    Ok(Value::real(real_op(a, b)))
}

fn integer_op(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
) -> Result<Value, VmError> {
    let (a, b) = integers(left, right).ok_or_else(|| mismatch(op, left, right))?;
    if b == 0 {
        return Err(division_by_zero());
    }
    int_op(a, b)
        .map(Value::integer)
        .ok_or_else(|| overflow(op.symbol()))
}

/// Value equality: numeric across integer/real, identity for references
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Reference(a), Value::Reference(b)) => a.ptr_eq(b),
        (Value::Primitive(a), Value::Primitive(b)) if a.value_type() == b.value_type() => a == b,
        (Value::Primitive(a), Value::Primitive(b)) => match (a.to_f64(), b.to_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => false,
    }
}

fn compare(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    test: fn(Ordering) -> bool,
) -> Result<Value, VmError> {
    let ordering = match (left.as_primitive(), right.as_primitive()) {
        (Some(Primitive::Integer(a)), Some(Primitive::Integer(b))) => Some(a.cmp(b)),
        (Some(Primitive::Str(a)), Some(Primitive::Str(b))) => Some(a.cmp(b)),
        _ => {
            let (a, b) = numbers(op, left, right)?;
            a.partial_cmp(&b)
        }
    };
    // NaN compares false both ways
    Ok(Value::boolean(ordering.is_some_and(test)))
}

/* ===================== Unary ===================== */

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, VmError> {
    match op {
        UnaryOp::Not | UnaryOp::Bang => Ok(Value::boolean(!operand.as_bool()?)),
        UnaryOp::Neg => match operand.as_primitive() {
            Some(Primitive::Integer(i)) => i
                .checked_neg()
                .map(Value::integer)
                .ok_or_else(|| overflow(op.symbol())),
            Some(Primitive::Real(r)) => Ok(Value::real(-r)),
            _ => Err(VmError::type_error(format!(
                "Operator '{}' cannot be applied to '{}'",
                op.symbol(),
                operand.type_name()
            ))),
        },
    }
}

/* ===================== Indexing ===================== */

/// `target[index]` for lists and strings. List elements are returned as
/// copies, so list-in-list access keeps sharing the inner list.
pub fn index(target: &Value, index: &Value) -> Result<Value, VmError> {
    let i = index.as_integer()?;
    // Resolved up front: the list stays locked while its items are read
    let type_name = target.type_name();
    let out_of_range = |len: usize| {
        VmError::index_error(format!(
            "Index {i} is out of range for {type_name} of length {len}"
        ))
    };

    match target {
        Value::Reference(r) => match &*r.lock() {
            Object::List(items) => usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .map(Value::copy)
                .ok_or_else(|| out_of_range(items.len())),
        },
        Value::Primitive(Primitive::Str(s)) => usize::try_from(i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::string(c.to_string()))
            .ok_or_else(|| out_of_range(s.chars().count())),
        Value::Primitive(_) => Err(VmError::type_error(format!(
            "Type '{type_name}' cannot be indexed"
        ))),
    }
}
