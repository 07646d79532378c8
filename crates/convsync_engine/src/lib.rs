//! # convsync Engine
//!
//! Sync state machine and collaborators for convsync.
//!
//! This crate provides:
//! - The sync protocol state machine (precondition → read local →
//!   materialize remote → read remote → merge → commit local → commit remote)
//! - Collaborator traits for process probing and file transfer, with
//!   `pgrep`/`ssh` and `rsync` implementations
//! - Store path resolution for browser profiles
//!
//! ## Key Invariants
//!
//! - States run in a fixed order and are never re-entered
//! - Any failure before the local commit leaves both stores untouched
//! - The local commit is the durability boundary: later failures are
//!   reported as [`SyncOutcome::RemotePending`], never rolled back
//! - No two store handles are ever open against the same path

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod probe;
mod process;
mod state;
mod store_io;
mod transport;
mod workspace;

pub use config::{RemoteHost, StoreLayout, SyncConfig, EXTENSION_ID};
pub use error::{Side, SyncError, SyncResult, TransferError, TransferResult};
pub use probe::{FixedProbe, PgrepProbe, ProbeTarget, ProcessProbe};
pub use state::{SyncEngine, SyncEvent, SyncOutcome, SyncReport, SyncState};
pub use store_io::{read_collection, write_collection};
pub use transport::{
    FileTransfer, LocalCopyTransfer, MockTransfer, RsyncTransfer, TransferDirection,
    TransferRequest,
};
pub use workspace::WorkingArea;
