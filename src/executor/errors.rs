//! Runtime error types
//!
//! Two families:
//! - `VmError::Runtime`: user-visible failures (Type, Index, Math, Name).
//!   They halt execution and are reported with the offending source line.
//! - `VmError::Internal`: broken invariants (empty stack, bad arity, ...).
//!   The user only sees a generic report; the host gets the error back.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Kinds of user-visible runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Type,
    Index,
    Math,
    Name,
}

impl ErrorKind {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::Type => "Type Error",
            ErrorKind::Index => "Index Error",
            ErrorKind::Math => "Math Error",
            ErrorKind::Name => "Name Error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Invariant violations inside the runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Runtime Empty Stack")]
    StackUnderflow,

    #[error("Bad parameter length during invocation of '{function}': expected {expected}, got {got}")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Entry function '{0}' is not an interpreted function")]
    NativeEntry(String),

    #[error("No active frame")]
    NoFrame,

    #[error("Jump target {target} is outside of '{function}' ({len} operations)")]
    BadJump {
        function: String,
        target: usize,
        len: usize,
    },
}

/// Error raised while executing an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("{kind}: {message}")]
    Runtime { kind: ErrorKind, message: String },

    #[error("Internal Error: {0}")]
    Internal(#[from] InternalError),
}

impl VmError {
    pub fn runtime(kind: ErrorKind, message: impl Into<String>) -> Self {
        VmError::Runtime {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::runtime(ErrorKind::Type, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::runtime(ErrorKind::Index, message)
    }

    pub fn math_error(message: impl Into<String>) -> Self {
        Self::runtime(ErrorKind::Math, message)
    }

    pub fn name_error(message: impl Into<String>) -> Self {
        Self::runtime(ErrorKind::Name, message)
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            VmError::Runtime { kind, .. } => Some(*kind),
            VmError::Internal(_) => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, VmError::Internal(_))
    }
}

/* ===================== Reports ===================== */

/// Two-line error report handed to the debug handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub header: String,
    pub body: String,
}

impl Report {
    /// Report for a user-visible error. `line` is the line of the operation
    /// that failed, when one is known.
    pub fn runtime(kind: ErrorKind, message: &str, line: Option<usize>) -> Self {
        let header = match line {
            Some(line) => format!("{kind}: Line {line}"),
            None => kind.to_string(),
        };
        Report {
            header,
            body: message.to_string(),
        }
    }

    /// Generic report shown for internal failures
    pub fn internal() -> Self {
        Report {
            header: "Unexpected Internal Error".to_string(),
            body: "Check log and report to author".to_string(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header, self.body)
    }
}
