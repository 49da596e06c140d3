//! Runtime value types
//!
//! Values are either primitives (copied on every transfer) or references
//! (shared: copying a reference yields the same instance).

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize, Serializer};

use super::super::errors::VmError;

/* ===================== Type Tags ===================== */

/// The runtime type of a value. Reference types have capitalized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Integer,
    Real,
    String,
    Boolean,
    List,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Integer => "integer",
            ValueType::Real => "real",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::List => "List",
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ValueType::List)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What `Value::assert_type` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Type(ValueType),
    /// `integer` or `real`
    Number,
}

/* ===================== Primitives ===================== */

/// Primitive payloads
///
/// Untagged so that bytecode files can write `1`, `2.5`, `"text"`, `true`
/// and `null` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Str(String),
}

impl Primitive {
    pub fn value_type(&self) -> ValueType {
        match self {
            Primitive::Null => ValueType::Null,
            Primitive::Boolean(_) => ValueType::Boolean,
            Primitive::Integer(_) => ValueType::Integer,
            Primitive::Real(_) => ValueType::Real,
            Primitive::Str(_) => ValueType::String,
        }
    }

    /// Numeric view of integers and reals
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Primitive::Integer(i) => Some(*i as f64),
            Primitive::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/* ===================== References ===================== */

/// Heap objects reachable through references
#[derive(Debug)]
pub enum Object {
    List(Vec<Value>),
}

impl Object {
    pub fn value_type(&self) -> ValueType {
        match self {
            Object::List(_) => ValueType::List,
        }
    }
}

/// Shared handle to an object; clones alias the same object
#[derive(Clone)]
pub struct Reference(Arc<Mutex<Object>>);

impl Reference {
    pub fn new(object: Object) -> Self {
        Reference(Arc::new(Mutex::new(object)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Object> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Reference) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({:#x})", self.addr())
    }
}

/* ===================== Values ===================== */

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Primitive(Primitive),
    Reference(Reference),
}

impl Value {
    pub fn null() -> Self {
        Value::Primitive(Primitive::Null)
    }

    pub fn integer(v: i64) -> Self {
        Value::Primitive(Primitive::Integer(v))
    }

    pub fn real(v: f64) -> Self {
        Value::Primitive(Primitive::Real(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::Primitive(Primitive::Str(v.into()))
    }

    pub fn boolean(v: bool) -> Self {
        Value::Primitive(Primitive::Boolean(v))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::Reference(Reference::new(Object::List(items)))
    }

    /// Copy according to value/reference semantics: primitives are
    /// duplicated, references return the same instance.
    pub fn copy(&self) -> Value {
        match self {
            Value::Primitive(p) => Value::Primitive(p.clone()),
            Value::Reference(r) => Value::Reference(r.clone()),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Primitive(p) => p.value_type(),
            Value::Reference(r) => r.lock().value_type(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(p) => Some(p),
            Value::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            Value::Primitive(_) => None,
        }
    }

    /// True when both values are references to the same object
    pub fn same_instance(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Reference(x), Value::Reference(y)) => x.ptr_eq(y),
            _ => false,
        }
    }

    /// Fail with a type error carrying `message` unless the value matches
    pub fn assert_type(&self, expected: Expected, message: &str) -> Result<(), VmError> {
        let actual = self.value_type();
        let ok = match expected {
            Expected::Number => matches!(actual, ValueType::Integer | ValueType::Real),
            Expected::Type(t) => t == actual,
        };
        if ok {
            Ok(())
        } else {
            Err(VmError::type_error(message))
        }
    }

    pub fn as_bool(&self) -> Result<bool, VmError> {
        match self {
            Value::Primitive(Primitive::Boolean(b)) => Ok(*b),
            _ => Err(VmError::type_error(format!(
                "Type '{}' cannot be interpreted as a boolean",
                self.type_name()
            ))),
        }
    }

    pub fn as_integer(&self) -> Result<i64, VmError> {
        match self {
            Value::Primitive(Primitive::Integer(i)) => Ok(*i),
            _ => Err(VmError::type_error(format!(
                "Type '{}' cannot be interpreted as an integer",
                self.type_name()
            ))),
        }
    }

    pub fn as_number(&self) -> Result<f64, VmError> {
        self.as_primitive()
            .and_then(Primitive::to_f64)
            .ok_or_else(|| {
                VmError::type_error(format!(
                    "Type '{}' cannot be interpreted as a number",
                    self.type_name()
                ))
            })
    }

    pub fn as_str(&self) -> Result<&str, VmError> {
        match self {
            Value::Primitive(Primitive::Str(s)) => Ok(s),
            _ => Err(VmError::type_error(format!(
                "Type '{}' cannot be interpreted as a string",
                self.type_name()
            ))),
        }
    }

    /// Run `f` against the items of a list value
    pub fn with_list<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, VmError> {
        match self {
            Value::Reference(r) => match &mut *r.lock() {
                Object::List(items) => Ok(f(items)),
            },
            Value::Primitive(_) => Err(VmError::type_error(format!(
                "Type '{}' cannot be interpreted as a List",
                self.type_name()
            ))),
        }
    }
}

/// Primitives compare by payload, references by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        Value::Primitive(p)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}

/* ===================== Display / Serialization ===================== */

/// Owned, cycle-free view of a value used for printing and serialization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Snapshot {
    Primitive(Primitive),
    List(Vec<Snapshot>),
    /// A list that contains itself
    Cycle(&'static str),
}

const CYCLE_MARKER: &str = "[...]";

impl Snapshot {
    fn of(value: &Value, seen: &mut Vec<usize>) -> Snapshot {
        match value {
            Value::Primitive(p) => Snapshot::Primitive(p.clone()),
            Value::Reference(r) => {
                if seen.contains(&r.addr()) {
                    return Snapshot::Cycle(CYCLE_MARKER);
                }
                // Copy out the handles first so no lock is held while recursing
                let items: Vec<Value> = match &*r.lock() {
                    Object::List(items) => items.clone(),
                };
                seen.push(r.addr());
                let snapshot = Snapshot::List(items.iter().map(|v| Snapshot::of(v, seen)).collect());
                seen.pop();
                snapshot
            }
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Snapshot::Primitive(Primitive::Null) => f.write_str("null"),
            Snapshot::Primitive(Primitive::Boolean(b)) => write!(f, "{b}"),
            Snapshot::Primitive(Primitive::Integer(i)) => write!(f, "{i}"),
            Snapshot::Primitive(Primitive::Real(r)) => write!(f, "{r:?}"),
            Snapshot::Primitive(Primitive::Str(s)) if nested => write!(f, "{s:?}"),
            Snapshot::Primitive(Primitive::Str(s)) => f.write_str(s),
            Snapshot::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write(f, true)?;
                }
                f.write_str("]")
            }
            Snapshot::Cycle(marker) => f.write_str(marker),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Snapshot::of(self, &mut Vec::new()).write(f, false)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Snapshot::of(self, &mut Vec::new()).serialize(serializer)
    }
}
