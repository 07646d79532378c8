//! Test fixtures and store helpers.
//!
//! Provides temporary on-disk LevelDB stores and builders for thread
//! records, so tests exercise the same store format the browser writes.

use convsync_core::RecordCollection;
use convsync_storage::{KvStore, LevelDbStore};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A storage key namespaced the way some browser versions write it.
pub const NAMESPACED_THREADS_KEY: &str =
    "_chrome-extension://hafalgcffhhmhjgeaciekloejcnadggi\u{0}\u{1}threads";

/// A LevelDB store in a temporary directory, removed on drop.
pub struct TestStore {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Creates an empty store.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("store");
        LevelDbStore::create(&path)
            .expect("Failed to create store")
            .close()
            .expect("Failed to close store");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Creates a store holding `pairs`.
    pub fn with_pairs(pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        let store = Self::empty();
        {
            let mut handle = store.open();
            for (key, value) in pairs {
                handle.put(&key, &value).expect("Failed to seed store");
            }
            handle.close().expect("Failed to close store");
        }
        store
    }

    /// Creates a store holding `collection` under `key`.
    pub fn with_collection(key: &str, collection: &RecordCollection) -> Self {
        Self::with_pairs([(key.as_bytes().to_vec(), encode(collection))])
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the store directory as a string, as transfers expect.
    pub fn location(&self) -> String {
        self.path.display().to_string()
    }

    /// Opens the store. The handle holds the store's lock until dropped.
    pub fn open(&self) -> LevelDbStore {
        LevelDbStore::open(&self.path).expect("Failed to open store")
    }

    /// Writes one pair.
    pub fn put(&self, key: &[u8], value: &[u8]) {
        let mut handle = self.open();
        handle.put(key, value).expect("Failed to write store");
        handle.close().expect("Failed to close store");
    }

    /// Returns every pair in key order.
    pub fn pairs(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut handle = self.open();
        let pairs = handle.iter().expect("Failed to iterate store").collect();
        handle.close().expect("Failed to close store");
        pairs
    }

    /// Returns the raw value stored under `key`.
    pub fn value(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the collection stored under `key`.
    pub fn collection_at(&self, key: &str) -> Option<RecordCollection> {
        self.value(key.as_bytes()).map(|bytes| {
            RecordCollection::from_slice(&bytes).expect("Stored value is not a collection")
        })
    }
}

/// Builds a thread record.
pub fn thread(provider: &str, text: &str, captured_at: &str) -> Value {
    json!({
        "provider": provider,
        "text": text,
        "capturedAt": captured_at,
    })
}

/// Builds a thread record without a recency marker.
pub fn thread_without_marker(provider: &str, text: &str) -> Value {
    json!({
        "provider": provider,
        "text": text,
    })
}

/// Builds a collection from `(id, record)` pairs, keeping their order.
pub fn collection<'a>(records: impl IntoIterator<Item = (&'a str, Value)>) -> RecordCollection {
    records
        .into_iter()
        .map(|(id, record)| (id.to_string(), record))
        .collect()
}

/// Encodes a collection the way the store holds it.
pub fn encode(collection: &RecordCollection) -> Vec<u8> {
    collection.to_vec().expect("Failed to encode collection")
}

/// Generates `count` unrelated pairs under keys starting with `prefix`.
///
/// Mixes JSON objects, JSON scalars, non-JSON text and invalid UTF-8.
pub fn noise_pairs(prefix: &str, count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count)
        .map(|i| {
            let key = format!("{prefix}{i:03}").into_bytes();
            let value = match i % 4 {
                0 => format!(r#"{{"setting":{i},"enabled":true}}"#).into_bytes(),
                1 => format!("{i}").into_bytes(),
                2 => b"plain text, not json".to_vec(),
                _ => vec![0xc3, 0x28, 0xff, i as u8],
            };
            (key, value)
        })
        .collect()
}
