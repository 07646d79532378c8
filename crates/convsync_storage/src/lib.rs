//! # convsync Storage
//!
//! Key-value store adapter for convsync.
//!
//! This crate is the lowest layer of convsync. Stores are **opaque ordered
//! byte maps** - the adapter does not interpret keys or values. Locating the
//! application record inside a store is the job of `convsync_core`.
//!
//! ## Design Principles
//!
//! - A store is opened at a path, iterated in native key order, and written
//!   with a single atomic `put`
//! - Every successful open is released exactly once, either through
//!   [`KvStore::close`] or on drop
//! - No store handle outlives the step that opened it
//!
//! ## Available Stores
//!
//! - [`LevelDbStore`] - On-disk LevelDB directories (Chromium extension storage)
//! - [`InMemoryStore`] - Ordered in-memory map for testing
//!
//! ## Example
//!
//! ```rust
//! use convsync_storage::{InMemoryStore, KvStore};
//!
//! let mut store = InMemoryStore::new();
//! store.put(b"threads", b"{}").unwrap();
//! let pairs: Vec<_> = store.iter().unwrap().collect();
//! assert_eq!(pairs, vec![(b"threads".to_vec(), b"{}".to_vec())]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod leveldb;
mod memory;

pub use backend::{display_key, KvStore, Pairs, StoreOpener};
pub use error::{StorageError, StorageResult};
pub use leveldb::{LevelDbOpener, LevelDbStore};
pub use memory::InMemoryStore;
