//! Error types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while opening, reading or writing a store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The path does not designate an existing store.
    #[error("store not found at {}", path.display())]
    NotFound {
        /// The path that was opened.
        path: PathBuf,
    },

    /// Another process holds the store's lock.
    #[error("store at {} is locked by another process", path.display())]
    Locked {
        /// The path that was opened.
        path: PathBuf,
    },

    /// The store exists but could not be opened.
    #[error("failed to open store at {}: {message}", path.display())]
    Open {
        /// The path that was opened.
        path: PathBuf,
        /// Diagnostic from the underlying store.
        message: String,
    },

    /// A write was rejected by the underlying store.
    #[error("write failed: {0}")]
    Write(String),

    /// The store's files are corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The store handle has already been closed.
    #[error("store is closed")]
    Closed,
}

impl StorageError {
    /// Returns true if the error means the store simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
