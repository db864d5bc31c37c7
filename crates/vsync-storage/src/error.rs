//! Storage error types for the object store abstraction layer.

use std::fmt;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("Object not found: {kind} {key}")]
    NotFound {
        /// The kind of object that was not found.
        kind: String,
        /// The namespace/name of the object.
        key: String,
    },

    /// Attempted to create an object that already exists.
    #[error("Object already exists: {kind} {key}")]
    AlreadyExists {
        /// The kind of object that already exists.
        kind: String,
        /// The namespace/name of the object.
        key: String,
    },

    /// The write was based on a stale resource version.
    #[error("Conflict on {kind} {key}: expected resourceVersion {expected}, found {actual}")]
    Conflict {
        kind: String,
        key: String,
        expected: String,
        actual: String,
    },

    /// The object is malformed for this store.
    #[error("Invalid object: {message}")]
    InvalidObject {
        /// Description of why the object is invalid.
        message: String,
    },

    /// The store could not be reached.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of the connection failure.
        message: String,
    },

    /// An internal store error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(kind: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(
        kind: impl Into<String>,
        key: impl fmt::Display,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key: key.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `InvalidObject` error.
    #[must_use]
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if this is a resource version conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if retrying the same operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Conflict { .. } | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::InvalidObject { .. } => ErrorCategory::Validation,
            Self::Unavailable { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Object not found.
    NotFound,
    /// Conflict (version or existence).
    Conflict,
    /// Validation error.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
