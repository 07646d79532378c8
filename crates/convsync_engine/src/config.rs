//! Configuration for sync runs and store path resolution.

use convsync_core::DEFAULT_STORAGE_KEY;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of the browser extension whose storage is synchronized.
pub const EXTENSION_ID: &str = "hafalgcffhhmhjgeaciekloejcnadggi";

/// Directory under a browser profile holding per-extension LevelDB stores.
const EXTENSION_SETTINGS_DIR: &str = "Local Extension Settings";

/// Browser config directories probed for the local store, in order.
const BROWSER_DIRS: [&str; 2] = ["google-chrome", "chromium"];

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Path of the local store directory.
    pub local_store: PathBuf,
    /// Location of the remote store, as understood by the transfer.
    pub remote_store: String,
    /// Human-readable name of the remote side, used in diagnostics.
    pub remote_name: String,
    /// Update only the local store; never write to the remote.
    pub local_only: bool,
    /// Logical storage key used by the key-name match rule and as the
    /// fallback write key.
    pub storage_key: String,
}

impl SyncConfig {
    /// Creates a configuration syncing `local_store` with `remote_store`.
    pub fn new(local_store: impl Into<PathBuf>, remote_store: impl Into<String>) -> Self {
        let remote_store = remote_store.into();
        Self {
            local_store: local_store.into(),
            remote_name: remote_store.clone(),
            remote_store,
            local_only: false,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Sets local-only mode.
    pub fn with_local_only(mut self, local_only: bool) -> Self {
        self.local_only = local_only;
        self
    }

    /// Sets the name shown for the remote side.
    pub fn with_remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = name.into();
        self
    }

    /// Sets the logical storage key.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Returns the number of protocol steps this run will report.
    pub fn total_steps(&self) -> usize {
        if self.local_only {
            6
        } else {
            7
        }
    }
}

/// An SSH destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    /// Host name or address.
    pub host: String,
    /// Login user; the SSH default applies when absent.
    pub user: Option<String>,
}

impl RemoteHost {
    /// Creates a destination for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
        }
    }

    /// Sets the login user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Returns the `user@host` (or bare `host`) target for `ssh` and `rsync`.
    pub fn ssh_target(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for RemoteHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ssh_target())
    }
}

/// Resolves store directories for a browser profile.
///
/// ```text
/// <config>/<browser>/<profile>/Local Extension Settings/<extension id>/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Browser profile directory name, e.g. `Default` or `Profile 1`.
    pub profile: String,
    /// Extension identifier.
    pub extension_id: String,
}

impl StoreLayout {
    /// Creates a layout for `profile` and the default extension.
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            extension_id: EXTENSION_ID.to_string(),
        }
    }

    /// Returns the store path relative to a browser config directory.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.profile)
            .join(EXTENSION_SETTINGS_DIR)
            .join(&self.extension_id)
    }

    /// Returns the local store path under the user's config directory.
    ///
    /// Returns `None` if the config directory cannot be determined.
    pub fn local_store(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|config| self.local_store_in(&config))
    }

    /// Returns the first candidate store under `config_dir` that exists,
    /// or the Chrome candidate when none does.
    pub fn local_store_in(&self, config_dir: &Path) -> PathBuf {
        let candidates: Vec<PathBuf> = BROWSER_DIRS
            .iter()
            .map(|browser| config_dir.join(browser).join(self.relative_path()))
            .collect();
        candidates
            .iter()
            .find(|path| path.exists())
            .unwrap_or(&candidates[0])
            .clone()
    }

    /// Returns the store path on a remote host, relative to its home.
    pub fn remote_store(&self) -> String {
        format!(
            "~/.config/{}/{}/{}/{}",
            BROWSER_DIRS[0], self.profile, EXTENSION_SETTINGS_DIR, self.extension_id
        )
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::new("Default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("/local", "~/remote")
            .with_local_only(true)
            .with_remote_name("workstation")
            .with_storage_key("conversations");

        assert_eq!(config.local_store, PathBuf::from("/local"));
        assert_eq!(config.remote_store, "~/remote");
        assert_eq!(config.remote_name, "workstation");
        assert_eq!(config.storage_key, "conversations");
        assert_eq!(config.total_steps(), 6);
    }

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::new("/local", "~/remote");
        assert!(!config.local_only);
        assert_eq!(config.remote_name, "~/remote");
        assert_eq!(config.storage_key, "threads");
        assert_eq!(config.total_steps(), 7);
    }

    #[test]
    fn ssh_target_includes_user() {
        assert_eq!(RemoteHost::new("10.0.0.5").ssh_target(), "10.0.0.5");
        assert_eq!(
            RemoteHost::new("box.local").with_user("john").ssh_target(),
            "john@box.local"
        );
    }

    #[test]
    fn remote_store_path() {
        assert_eq!(
            StoreLayout::new("Profile 1").remote_store(),
            "~/.config/google-chrome/Profile 1/Local Extension Settings/hafalgcffhhmhjgeaciekloejcnadggi"
        );
    }

    #[test]
    fn local_store_prefers_existing_candidate() {
        let dir = tempdir().unwrap();
        let layout = StoreLayout::default();

        let chrome = dir.path().join("google-chrome").join(layout.relative_path());
        let chromium = dir.path().join("chromium").join(layout.relative_path());

        assert_eq!(layout.local_store_in(dir.path()), chrome);

        fs::create_dir_all(&chromium).unwrap();
        assert_eq!(layout.local_store_in(dir.path()), chromium);

        fs::create_dir_all(&chrome).unwrap();
        assert_eq!(layout.local_store_in(dir.path()), chrome);
    }
}
