//! Error types for convsync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while reading or encoding records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store error while scanning.
    #[error("storage error: {0}")]
    Storage(#[from] convsync_storage::StorageError),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value decoded to JSON but not to a record collection.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// The JSON type that was found instead.
        found: &'static str,
    },
}
