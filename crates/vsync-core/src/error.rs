use thiserror::Error;

/// Core error types for vsync object handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid apiVersion: {0}")]
    InvalidApiVersion(String),

    #[error("Invalid kind: {0}")]
    InvalidKind(String),

    #[error("Object metadata is missing {field}")]
    MissingMetadata { field: &'static str },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidApiVersion error
    pub fn invalid_api_version(api_version: impl Into<String>) -> Self {
        Self::InvalidApiVersion(api_version.into())
    }

    /// Create a new InvalidKind error
    pub fn invalid_kind(kind: impl Into<String>) -> Self {
        Self::InvalidKind(kind.into())
    }

    /// Create a new MissingMetadata error
    pub fn missing_metadata(field: &'static str) -> Self {
        Self::MissingMetadata { field }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidApiVersion(_) | Self::InvalidKind(_) => ErrorCategory::Validation,
            Self::MissingMetadata { .. } => ErrorCategory::Metadata,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Metadata,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Metadata => write!(f, "metadata"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
