//! Host-side error types.
//!
//! `HostError` is the exception a host API throws. It never crosses the
//! boundary as a Rust error: the sandbox layer captures it into the reference
//! table as an Error object (see [`HostError::to_value`]) and hands the
//! sandbox a slot index instead.

use crate::object::{ObjectKind, ObjectRef};
use crate::value::HostValue;

/// Exception class of a [`HostError`].
///
/// Names follow the exception names a DOM-capable host reports, so that
/// `debug_string` of a captured exception reads the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostErrorKind {
    Error,
    TypeError,
    RangeError,
    SyntaxError,
    NotFound,
    HierarchyRequest,
    InvalidCharacter,
    InvalidState,
    Namespace,
    NotSupported,
}

impl HostErrorKind {
    /// The exception name as seen by the sandbox.
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::SyntaxError => "SyntaxError",
            Self::NotFound => "NotFoundError",
            Self::HierarchyRequest => "HierarchyRequestError",
            Self::InvalidCharacter => "InvalidCharacterError",
            Self::InvalidState => "InvalidStateError",
            Self::Namespace => "NamespaceError",
            Self::NotSupported => "NotSupportedError",
        }
    }
}

/// An exception thrown by a host operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {}", .kind.name(), .message)]
pub struct HostError {
    pub kind: HostErrorKind,
    pub message: String,
}

impl HostError {
    pub fn new(kind: HostErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Error, message)
    }

    /// Create a `TypeError` (wrong value type, non-callable callback, ...).
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::TypeError, message)
    }

    /// Create a `RangeError`.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::RangeError, message)
    }

    /// Create a `SyntaxError`.
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::SyntaxError, message)
    }

    /// Create a `NotFoundError`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::NotFound, message)
    }

    /// Create a `HierarchyRequestError`.
    pub fn hierarchy_request(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::HierarchyRequest, message)
    }

    /// Create an `InvalidCharacterError`.
    pub fn invalid_character(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::InvalidCharacter, message)
    }

    /// Create an `InvalidStateError`.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::InvalidState, message)
    }

    /// Create a `NamespaceError`.
    pub fn namespace(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Namespace, message)
    }

    /// Create a `NotSupportedError`.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::NotSupported, message)
    }

    /// Materialize the exception as a host Error object.
    pub fn to_value(&self) -> HostValue {
        HostValue::Object(ObjectRef::new(ObjectKind::Error {
            name: self.kind.name().to_string(),
            message: self.message.clone(),
        }))
    }
}
