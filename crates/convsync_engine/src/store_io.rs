//! Scoped read and write of a store's record collection.
//!
//! Each call opens the store, does its work and closes it before
//! returning, so no handle survives into the next protocol step.

use crate::error::{Side, SyncError, SyncResult};
use convsync_core::{CoreError, CoreResult, LocatedRecord, RecordCollection, RecordLocator};
use convsync_storage::{display_key, KvStore, StoreOpener};
use std::path::Path;
use tracing::{debug, info};

/// Opens the store at `path`, locates its record collection and closes it.
///
/// # Errors
///
/// Returns [`SyncError::Read`] if the store cannot be opened or scanned and
/// [`SyncError::RecordNotFound`] if no pair matches.
pub fn read_collection<O: StoreOpener>(
    opener: &O,
    locator: &RecordLocator,
    path: &Path,
    side: Side,
) -> SyncResult<LocatedRecord> {
    let read_error = |source: CoreError| SyncError::Read {
        side,
        path: path.to_path_buf(),
        remote: None,
        source,
        unchecked_remote: false,
    };

    let mut store = opener.open(path).map_err(|e| read_error(e.into()))?;
    let located = locator.locate(&mut store).map_err(read_error)?;
    store.close().map_err(|e| read_error(e.into()))?;

    let located = located.ok_or_else(|| SyncError::RecordNotFound {
        side,
        path: path.to_path_buf(),
        remote: None,
        unchecked_remote: false,
    })?;
    info!(
        %side,
        key = %display_key(&located.key),
        rule = located.rule.name(),
        records = located.collection.len(),
        "read record collection"
    );
    Ok(located)
}

/// Opens the store at `path`, writes `collection` and closes it.
///
/// The collection is written under `key`, the key it was located under.
/// When no key was located the logical `fallback_key` is used.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, written or flushed.
pub fn write_collection<O: StoreOpener>(
    opener: &O,
    path: &Path,
    key: Option<&[u8]>,
    fallback_key: &str,
    collection: &RecordCollection,
) -> CoreResult<()> {
    let key = key.unwrap_or(fallback_key.as_bytes());
    let value = collection.to_vec()?;

    let mut store = opener.open(path)?;
    store.put(key, &value)?;
    store.close()?;

    debug!(
        path = %path.display(),
        key = %display_key(key),
        bytes = value.len(),
        "wrote record collection"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use convsync_storage::{LevelDbOpener, LevelDbStore};
    use serde_json::json;
    use tempfile::tempdir;

    const CHROME_KEY: &str = "_chrome-extension://x\u{0}\u{1}threads";

    fn seeded(path: &Path, pairs: &[(&str, &str)]) {
        let mut store = LevelDbStore::create(path).unwrap();
        for (key, value) in pairs {
            store.put(key.as_bytes(), value.as_bytes()).unwrap();
        }
        store.close().unwrap();
    }

    #[test]
    fn read_missing_store_is_read_error() {
        let dir = tempdir().unwrap();
        let err = read_collection(
            &LevelDbOpener,
            &RecordLocator::default(),
            &dir.path().join("absent"),
            Side::Local,
        )
        .unwrap_err();
        assert!(err.is_store_missing());
    }

    #[test]
    fn read_store_without_record_is_not_found() {
        let dir = tempdir().unwrap();
        seeded(dir.path(), &[("settings", r#"{"theme":"dark"}"#)]);

        let err = read_collection(
            &LevelDbOpener,
            &RecordLocator::default(),
            dir.path(),
            Side::Remote,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SyncError::RecordNotFound {
                side: Side::Remote,
                ..
            }
        ));
    }

    #[test]
    fn read_releases_store() {
        let dir = tempdir().unwrap();
        seeded(dir.path(), &[("threads", "{}")]);

        read_collection(&LevelDbOpener, &RecordLocator::default(), dir.path(), Side::Local)
            .unwrap();
        assert!(LevelDbStore::open(dir.path()).is_ok());
    }

    #[test]
    fn write_uses_located_key() {
        let dir = tempdir().unwrap();
        seeded(dir.path(), &[(CHROME_KEY, "{}")]);
        let collection: RecordCollection =
            serde_json::from_value(json!({"t1": {"provider": "p", "text": "hi"}})).unwrap();

        write_collection(
            &LevelDbOpener,
            dir.path(),
            Some(CHROME_KEY.as_bytes()),
            "threads",
            &collection,
        )
        .unwrap();

        let mut store = LevelDbStore::open(dir.path()).unwrap();
        let pairs: Vec<_> = store.iter().unwrap().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, collection.to_vec().unwrap());
    }

    #[test]
    fn write_without_located_key_uses_fallback() {
        let dir = tempdir().unwrap();
        seeded(dir.path(), &[("other", "1")]);

        write_collection(
            &LevelDbOpener,
            dir.path(),
            None,
            "threads",
            &RecordCollection::new(),
        )
        .unwrap();

        let mut store = LevelDbStore::open(dir.path()).unwrap();
        let keys: Vec<Vec<u8>> = store.iter().unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"other".to_vec(), b"threads".to_vec()]);
    }
}
