use thiserror::Error;
use vsync_core::{CoreError, ObjectKey};
use vsync_storage::StorageError;

/// Errors surfaced by the reconciler to its caller.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Identity {key} cannot be resolved: {reason}")]
    IdentityUnresolvable { key: String, reason: String },

    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    #[error("Cannot classify object: {0}")]
    Classification(String),

    #[error("Invalid object: {0}")]
    Object(#[from] CoreError),

    #[error("Reconciliation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn identity_unresolvable(key: &ObjectKey, reason: impl Into<String>) -> Self {
        Self::IdentityUnresolvable {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unknown_kind(api_version: &str, kind: &str) -> Self {
        Self::UnknownKind(format!("{api_version}, Kind={kind}"))
    }

    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn is_identity_unresolvable(&self) -> bool {
        matches!(self, Self::IdentityUnresolvable { .. })
    }

    /// Whether the trigger layer should requeue the key with backoff.
    ///
    /// Store failures (including create races and concurrent deletes) converge
    /// on a later pass; everything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => !matches!(e, StorageError::InvalidObject { .. }),
            Self::IdentityUnresolvable { .. }
            | Self::UnknownKind(_)
            | Self::Classification(_)
            | Self::Object(_)
            | Self::Cancelled
            | Self::Config(_) => false,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
