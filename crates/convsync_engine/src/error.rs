//! Error types for the sync engine.

use convsync_core::CoreError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for file transfers.
pub type TransferResult<T> = Result<T, TransferError>;

/// Which copy of the store an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The store on this machine.
    Local,
    /// The working copy of the remote store.
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => f.write_str("local"),
            Side::Remote => f.write_str("remote"),
        }
    }
}

/// Errors raised by a file transfer collaborator.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The transfer program is not installed.
    #[error("{command} not found; install it first (e.g. `sudo apt-get install {command}`)")]
    CommandMissing {
        /// Program name.
        command: String,
    },

    /// The transfer program exited unsuccessfully.
    #[error("{command} failed ({status}):\n{stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Local filesystem error while copying.
    #[error("I/O error during transfer: {0}")]
    Io(#[from] io::Error),
}

/// Errors that can occur during a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The browser holds the local store open.
    #[error("browser is running locally; close it before syncing")]
    LocalBusy,

    /// The browser holds the remote store open.
    #[error("browser is running on {remote}; close it there before syncing")]
    RemoteBusy {
        /// Remote description.
        remote: String,
    },

    /// A store could not be opened or scanned.
    #[error("failed to read {side} store {}: {source}", location(.path, .remote.as_deref()))]
    Read {
        /// Which store.
        side: Side,
        /// Store path; for the remote side, the working copy.
        path: PathBuf,
        /// The remote the working copy was fetched from.
        remote: Option<String>,
        /// Underlying error.
        #[source]
        source: CoreError,
        /// Whether the remote may have been read while in use.
        unchecked_remote: bool,
    },

    /// The store holds no record collection.
    #[error("no record collection found in {side} store {}", location(.path, .remote.as_deref()))]
    RecordNotFound {
        /// Which store.
        side: Side,
        /// Store path; for the remote side, the working copy.
        path: PathBuf,
        /// The remote the working copy was fetched from.
        remote: Option<String>,
        /// Whether the remote may have been read while in use.
        unchecked_remote: bool,
    },

    /// Copying the remote store into the working area failed.
    #[error("failed to fetch remote store: {0}")]
    Fetch(#[source] TransferError),

    /// Writing the merged collection into the local store failed.
    #[error("failed to write local store: {0}")]
    LocalCommit(#[source] CoreError),

    /// Writing the merged collection into the remote working copy failed.
    #[error("failed to write remote working copy: {0}")]
    RemoteCommit(#[source] CoreError),

    /// Pushing the updated working copy back to the remote failed.
    #[error("failed to push to remote: {0}")]
    Push(#[source] TransferError),

    /// The working area could not be created.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The run was interrupted.
    #[error("sync cancelled")]
    Cancelled,
}

/// Describes where a store lives, preferring the remote's name over the
/// working copy path.
fn location(path: &Path, remote: Option<&str>) -> String {
    match remote {
        Some(remote) => format!("on {remote}"),
        None => format!("at {}", path.display()),
    }
}

impl SyncError {
    /// Attributes a read error on the working copy to the remote `name`.
    pub(crate) fn on_remote(self, name: &str, unchecked: bool) -> Self {
        match self {
            SyncError::Read {
                side, path, source, ..
            } => SyncError::Read {
                side,
                path,
                remote: Some(name.to_string()),
                source,
                unchecked_remote: unchecked,
            },
            SyncError::RecordNotFound { side, path, .. } => SyncError::RecordNotFound {
                side,
                path,
                remote: Some(name.to_string()),
                unchecked_remote: unchecked,
            },
            other => other,
        }
    }

    /// Returns an operator hint for errors with a likely known cause.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SyncError::Read {
                side: Side::Remote,
                unchecked_remote: true,
                ..
            }
            | SyncError::RecordNotFound {
                side: Side::Remote,
                unchecked_remote: true,
                ..
            } => Some(
                "the browser may be running on the remote host and interfering with the read, \
                 or the remote store may be corrupted; consider closing it there",
            ),
            SyncError::LocalBusy | SyncError::RemoteBusy { .. } => {
                Some("close the browser and run the sync again")
            }
            SyncError::RemoteCommit(_) | SyncError::Push(_) => Some(
                "local storage has been updated; copy the store to the remote host manually",
            ),
            _ => None,
        }
    }

    /// Returns true if the store itself does not exist.
    pub fn is_store_missing(&self) -> bool {
        matches!(
            self,
            SyncError::Read {
                source: CoreError::Storage(err),
                ..
            } if err.is_not_found()
        )
    }
}
