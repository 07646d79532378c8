//! Transfer of store directories between machines.

use crate::config::RemoteHost;
use crate::error::{TransferError, TransferResult};
use crate::process::run_checked;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Direction of a transfer, seen from this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Copy the remote store into a local directory.
    Pull,
    /// Copy a local directory over the remote store.
    Push,
}

/// A whole-directory transfer between a local path and the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Transfer direction.
    pub direction: TransferDirection,
    /// Local directory.
    pub local: PathBuf,
    /// Remote store location, as understood by the transfer.
    pub remote: String,
}

impl TransferRequest {
    /// Creates a request copying `remote` into `local`.
    pub fn pull(remote: impl Into<String>, local: impl Into<PathBuf>) -> Self {
        Self {
            direction: TransferDirection::Pull,
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// Creates a request copying `local` over `remote`.
    pub fn push(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            direction: TransferDirection::Push,
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// Copies store directories between this machine and the remote.
///
/// Transfers are recursive and must leave the destination usable as a
/// self-contained store image.
pub trait FileTransfer {
    /// Performs `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] carrying the underlying diagnostic.
    fn transfer(&self, request: &TransferRequest) -> TransferResult<()>;
}

impl<T: FileTransfer + ?Sized> FileTransfer for &T {
    fn transfer(&self, request: &TransferRequest) -> TransferResult<()> {
        (**self).transfer(request)
    }
}

/// Transfers with `rsync -az`, over SSH when a host is configured.
#[derive(Debug, Clone)]
pub struct RsyncTransfer {
    remote: Option<RemoteHost>,
}

impl RsyncTransfer {
    /// Creates a transfer to `remote`, or between local paths when `None`.
    pub fn new(remote: Option<RemoteHost>) -> Self {
        Self { remote }
    }

    fn remote_arg(&self, path: &str) -> String {
        match &self.remote {
            Some(host) => format!("{}:{}/", host.ssh_target(), path.trim_end_matches('/')),
            None => format!("{}/", path.trim_end_matches('/')),
        }
    }

    fn args(&self, request: &TransferRequest) -> Vec<String> {
        let local = format!("{}/", request.local.display().to_string().trim_end_matches('/'));
        let remote = self.remote_arg(&request.remote);
        let (source, destination) = match request.direction {
            TransferDirection::Pull => (remote, local),
            TransferDirection::Push => (local, remote),
        };
        vec!["-az".into(), source, destination]
    }
}

impl FileTransfer for RsyncTransfer {
    fn transfer(&self, request: &TransferRequest) -> TransferResult<()> {
        if request.direction == TransferDirection::Pull {
            fs::create_dir_all(&request.local)?;
        }
        info!(direction = ?request.direction, remote = %request.remote, "transferring store with rsync");
        run_checked("rsync", &self.args(request))?;
        Ok(())
    }
}

/// Transfers by recursive copy between local directories.
///
/// Useful when the remote profile is reachable as a mounted filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCopyTransfer;

impl FileTransfer for LocalCopyTransfer {
    fn transfer(&self, request: &TransferRequest) -> TransferResult<()> {
        let remote = Path::new(&request.remote);
        match request.direction {
            TransferDirection::Pull => copy_dir(remote, &request.local),
            TransferDirection::Push => copy_dir(&request.local, remote),
        }
    }
}

/// Recursively copies `source` into `destination`, overwriting files.
fn copy_dir(source: &Path, destination: &Path) -> TransferResult<()> {
    if !source.is_dir() {
        return Err(TransferError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source directory does not exist: {}", source.display()),
        )));
    }
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    debug!(from = %source.display(), to = %destination.display(), "copied directory");
    Ok(())
}

/// A transfer for tests: copies like [`LocalCopyTransfer`], records every
/// request and can be told to fail a direction.
#[derive(Debug, Default)]
pub struct MockTransfer {
    requests: Mutex<Vec<TransferRequest>>,
    fail_pull: Mutex<Option<String>>,
    fail_push: Mutex<Option<String>>,
}

impl MockTransfer {
    /// Creates a mock transfer that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every pull fail with `stderr`.
    pub fn fail_pull(&self, stderr: impl Into<String>) {
        *self.fail_pull.lock() = Some(stderr.into());
    }

    /// Makes every push fail with `stderr`.
    pub fn fail_push(&self, stderr: impl Into<String>) {
        *self.fail_push.lock() = Some(stderr.into());
    }

    /// Returns the requests seen so far, in order.
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().clone()
    }
}

impl FileTransfer for MockTransfer {
    fn transfer(&self, request: &TransferRequest) -> TransferResult<()> {
        self.requests.lock().push(request.clone());
        let failure = match request.direction {
            TransferDirection::Pull => self.fail_pull.lock().clone(),
            TransferDirection::Push => self.fail_push.lock().clone(),
        };
        if let Some(stderr) = failure {
            return Err(TransferError::Failed {
                command: format!("mock {:?}", request.direction),
                status: "exit status: 1".into(),
                stderr,
            });
        }
        LocalCopyTransfer.transfer(request)
    }
}
