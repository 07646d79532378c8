//! Scoped temporary working area for the remote store copy.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Subdirectory holding the materialized remote store.
const REMOTE_STORE_DIR: &str = "remote_db";

/// A temporary directory that lives for the remote half of a sync run.
///
/// The directory and everything in it is removed when the value is
/// dropped, on success and on every error path.
#[derive(Debug)]
pub struct WorkingArea {
    dir: TempDir,
}

impl WorkingArea {
    /// Creates a fresh working area under the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("convsync-").tempdir()?;
        Ok(Self { dir })
    }

    /// Returns the working area root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the directory the remote store is copied into.
    pub fn remote_store(&self) -> PathBuf {
        self.dir.path().join(REMOTE_STORE_DIR)
    }
}
