//! In-memory store for testing.

use crate::backend::{KvStore, Pairs};
use crate::error::{StorageError, StorageResult};
use std::collections::BTreeMap;

/// An in-memory ordered store.
///
/// Pairs are kept in a `BTreeMap`, so iteration follows the same ascending
/// bytewise order as LevelDB. Suitable for:
/// - Unit tests of record location
/// - Exercising scan order without touching the filesystem
///
/// # Example
///
/// ```rust
/// use convsync_storage::{InMemoryStore, KvStore};
///
/// let mut store = InMemoryStore::with_pairs([(b"b".to_vec(), b"2".to_vec())]);
/// store.put(b"a", b"1").unwrap();
/// let keys: Vec<_> = store.iter().unwrap().map(|(k, _)| k).collect();
/// assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    pairs: BTreeMap<Vec<u8>, Vec<u8>>,
    closed: bool,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `pairs`.
    #[must_use]
    pub fn with_pairs(pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
            closed: false,
        }
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.pairs.get(key).map(Vec::as_slice)
    }

    /// Returns the number of stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if the store holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns true once `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl KvStore for InMemoryStore {
    fn iter(&mut self) -> StorageResult<Pairs<'_>> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(Box::new(
            self.pairs.iter().map(|(k, v)| (k.clone(), v.clone())),
        ))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        self.pairs.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        Ok(())
    }
}
