//! LevelDB-backed store for on-disk extension storage.

use crate::backend::{KvStore, Pairs, StoreOpener};
use crate::error::{StorageError, StorageResult};
use rusty_leveldb::{LdbIterator, Options, Status, StatusCode, DB};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every LevelDB directory carries a `CURRENT` file naming its manifest.
const CURRENT_FILE: &str = "CURRENT";

/// A store backed by a LevelDB directory.
///
/// The directory layout is whatever LevelDB writes (`CURRENT`, `LOCK`,
/// `MANIFEST-*`, `*.log`, `*.ldb`); this type treats it as a black box.
///
/// # Locking
///
/// LevelDB takes an exclusive lock on the directory's `LOCK` file when
/// opened. A second open of the same path, from this process or another,
/// fails with [`StorageError::Locked`] until the first handle is closed or
/// dropped.
///
/// # Example
///
/// ```no_run
/// use convsync_storage::{KvStore, LevelDbStore};
/// use std::path::Path;
///
/// let mut store = LevelDbStore::open(Path::new("Local Extension Settings/abc")).unwrap();
/// for (key, value) in store.iter().unwrap() {
///     println!("{} bytes under {} byte key", value.len(), key.len());
/// }
/// store.close().unwrap();
/// ```
pub struct LevelDbStore {
    path: PathBuf,
    db: Option<DB>,
}

impl LevelDbStore {
    /// Opens an existing LevelDB directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `path` is not a LevelDB
    /// directory, [`StorageError::Locked`] if the lock is held elsewhere, and
    /// [`StorageError::Open`] or [`StorageError::Corrupted`] otherwise.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if !path.join(CURRENT_FILE).is_file() {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut options = Options::default();
        options.create_if_missing = false;
        let db = DB::open(path, options).map_err(|status| open_error(path, status))?;
        debug!(path = %path.display(), "opened leveldb store");

        Ok(Self {
            path: path.to_path_buf(),
            db: Some(db),
        })
    }

    /// Opens a LevelDB directory, creating it and its parents if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or opened.
    pub fn create(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let mut options = Options::default();
        options.create_if_missing = true;
        let db = DB::open(path, options).map_err(|status| open_error(path, status))?;

        Ok(Self {
            path: path.to_path_buf(),
            db: Some(db),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn db(&mut self) -> StorageResult<&mut DB> {
        self.db.as_mut().ok_or(StorageError::Closed)
    }
}

impl std::fmt::Debug for LevelDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelDbStore")
            .field("path", &self.path)
            .field("open", &self.db.is_some())
            .finish()
    }
}

impl KvStore for LevelDbStore {
    fn iter(&mut self) -> StorageResult<Pairs<'_>> {
        let iter = self
            .db()?
            .new_iter()
            .map_err(|status| StorageError::Corrupted(status.to_string()))?;
        Ok(Box::new(LevelDbPairs { iter }))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let db = self.db()?;
        db.put(key, value)
            .map_err(|status| StorageError::Write(status.to_string()))?;
        db.flush()
            .map_err(|status| StorageError::Write(status.to_string()))?;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        if let Some(mut db) = self.db.take() {
            let flushed = db.flush();
            // Dropping the handle releases the LOCK file.
            drop(db);
            flushed.map_err(|status| StorageError::Write(status.to_string()))?;
            debug!(path = %self.path.display(), "closed leveldb store");
        }
        Ok(())
    }
}

/// Opens [`LevelDbStore`]s by path.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelDbOpener;

impl StoreOpener for LevelDbOpener {
    type Store = LevelDbStore;

    fn open(&self, path: &Path) -> StorageResult<LevelDbStore> {
        LevelDbStore::open(path)
    }
}

struct LevelDbPairs<I> {
    iter: I,
}

impl<I: LdbIterator> Iterator for LevelDbPairs<I> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.iter.advance() {
            return None;
        }
        let (mut key, mut value) = (Vec::new(), Vec::new());
        if self.iter.current(&mut key, &mut value) {
            Some((key, value))
        } else {
            None
        }
    }
}

fn open_error(path: &Path, status: Status) -> StorageError {
    match status.code {
        StatusCode::LockError => StorageError::Locked {
            path: path.to_path_buf(),
        },
        StatusCode::Corruption => StorageError::Corrupted(format!(
            "{}: {}",
            path.display(),
            status
        )),
        _ => StorageError::Open {
            path: path.to_path_buf(),
            message: status.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collect(store: &mut LevelDbStore) -> Vec<(Vec<u8>, Vec<u8>)> {
        store.iter().unwrap().collect()
    }

    #[test]
    fn open_missing_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let result = LevelDbStore::open(&dir.path().join("absent"));
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn open_plain_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let result = LevelDbStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn put_then_iterate_in_key_order() {
        let dir = tempdir().unwrap();
        let mut store = LevelDbStore::create(dir.path()).unwrap();

        store.put(b"b", b"2").unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"c", b"3").unwrap();

        let keys: Vec<Vec<u8>> = collect(&mut store).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn iteration_is_restartable() {
        let dir = tempdir().unwrap();
        let mut store = LevelDbStore::create(dir.path()).unwrap();
        store.put(b"k", b"v").unwrap();

        assert_eq!(collect(&mut store), collect(&mut store));
    }

    #[test]
    fn put_overwrites_previous_value() {
        let dir = tempdir().unwrap();
        let mut store = LevelDbStore::create(dir.path()).unwrap();
        store.put(b"threads", b"{}").unwrap();
        store.put(b"threads", b"{\"a\":1}").unwrap();

        assert_eq!(
            collect(&mut store),
            vec![(b"threads".to_vec(), b"{\"a\":1}".to_vec())]
        );
    }

    #[test]
    fn data_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = LevelDbStore::create(dir.path()).unwrap();
            store.put(b"key", b"persistent").unwrap();
            store.close().unwrap();
        }

        let mut store = LevelDbStore::open(dir.path()).unwrap();
        assert_eq!(
            collect(&mut store),
            vec![(b"key".to_vec(), b"persistent".to_vec())]
        );
    }

    #[test]
    fn second_open_is_locked_until_close() {
        let dir = tempdir().unwrap();
        let mut first = LevelDbStore::create(dir.path()).unwrap();

        let second = LevelDbStore::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked { .. })));

        first.close().unwrap();
        assert!(LevelDbStore::open(dir.path()).is_ok());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempdir().unwrap();
        {
            let _store = LevelDbStore::create(dir.path()).unwrap();
        }
        assert!(LevelDbStore::open(dir.path()).is_ok());
    }

    #[test]
    fn closed_store_rejects_operations() {
        let dir = tempdir().unwrap();
        let mut store = LevelDbStore::create(dir.path()).unwrap();
        store.close().unwrap();
        store.close().unwrap();

        assert!(matches!(store.put(b"k", b"v"), Err(StorageError::Closed)));
        assert!(matches!(store.iter(), Err(StorageError::Closed)));
    }

    #[test]
    fn opener_opens_existing_store() {
        let dir = tempdir().unwrap();
        LevelDbStore::create(dir.path()).unwrap().close().unwrap();

        let store = LevelDbOpener.open(dir.path()).unwrap();
        assert_eq!(store.path(), dir.path());
    }
}
