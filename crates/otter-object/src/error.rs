//! VM error types

use crate::value::Value;
use thiserror::Error;

/// The kind of a native JavaScript error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `Error`
    Error,
    /// `TypeError`
    TypeError,
    /// `ReferenceError`
    ReferenceError,
    /// `RangeError`
    RangeError,
    /// `SyntaxError`
    SyntaxError,
}

impl ErrorKind {
    /// Constructor name of the error kind
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }
}

/// VM execution errors
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., invalid descriptor transition, calling non-function)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (unresolvable or uninitialized binding)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error (e.g., invalid array length)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Syntax error (e.g., unparsable BigInt string)
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Internal error
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Thrown JS exception
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),
}

/// A thrown JavaScript value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// The thrown value (as a string representation)
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a syntax error
    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create an exception from a thrown JS value
    pub fn exception(value: Value) -> Self {
        let message = if let Some(s) = value.as_string() {
            s.as_str().to_string()
        } else {
            format!("{:?}", value)
        };
        Self::Exception(Box::new(ThrownValue { message, value }))
    }

    /// The native error kind this error corresponds to.
    ///
    /// For thrown values this inspects the error object's class; thrown
    /// non-error values have no kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            VmError::TypeError(_) => Some(ErrorKind::TypeError),
            VmError::ReferenceError(_) => Some(ErrorKind::ReferenceError),
            VmError::RangeError(_) => Some(ErrorKind::RangeError),
            VmError::SyntaxError(_) => Some(ErrorKind::SyntaxError),
            VmError::InternalError(_) => None,
            VmError::Exception(thrown) => thrown.value.as_object().and_then(|o| o.error_kind()),
        }
    }

    /// The thrown JS value, for `Exception` errors
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            VmError::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
