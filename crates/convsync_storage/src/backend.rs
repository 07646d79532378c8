//! Store trait definitions.

use crate::error::StorageResult;
use std::borrow::Cow;
use std::path::Path;

/// A lazy sequence of `(key, value)` pairs in the store's native key order.
pub type Pairs<'a> = Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

/// An opened, ordered key-value store.
///
/// Stores are **opaque byte maps**. They provide ordered iteration and a
/// single atomic put. convsync owns all interpretation of keys and values.
///
/// # Invariants
///
/// - `iter` yields every live pair exactly once, in ascending bytewise key
///   order, and can be called any number of times
/// - `put` is durable once it returns `Ok`
/// - `close` releases the underlying lock; dropping an unclosed store
///   releases it as well
///
/// # Implementors
///
/// - [`super::LevelDbStore`] - On-disk LevelDB
/// - [`super::InMemoryStore`] - For testing
pub trait KvStore {
    /// Starts a fresh scan over all pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or a snapshot cannot be taken.
    fn iter(&mut self) -> StorageResult<Pairs<'_>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Write`] if the underlying store rejects
    /// the write, or [`crate::StorageError::Closed`] after `close`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Flushes and releases the store.
    ///
    /// Calling `close` more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if pending data cannot be flushed.
    fn close(&mut self) -> StorageResult<()>;
}

/// Opens stores by filesystem path.
pub trait StoreOpener {
    /// The store type produced by this opener.
    type Store: KvStore;

    /// Opens an existing store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if nothing is stored at
    /// `path`, [`crate::StorageError::Locked`] if another process holds the
    /// store, and [`crate::StorageError::Open`] for any other failure.
    fn open(&self, path: &Path) -> StorageResult<Self::Store>;
}

/// Renders a raw key for logs, replacing invalid UTF-8.
pub fn display_key(key: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(key)
}
