//! Sync protocol state machine.

use crate::config::SyncConfig;
use crate::error::{Side, SyncError, SyncResult};
use crate::probe::{ProbeTarget, ProcessProbe};
use crate::store_io::{read_collection, write_collection};
use crate::transport::{FileTransfer, TransferRequest};
use crate::workspace::WorkingArea;
use convsync_core::{merge, LocatedRecord, MergeStats, RecordCollection, RecordLocator};
use convsync_storage::StoreOpener;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The protocol step the engine is in.
///
/// Steps run strictly in declaration order and are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No run started yet.
    Idle,
    /// Checking that no conflicting process holds a store.
    Precondition,
    /// Reading the local store.
    ReadLocal,
    /// Copying the remote store into the working area.
    MaterializeRemote,
    /// Reading the working copy of the remote store.
    ReadRemote,
    /// Merging the two collections.
    Merge,
    /// Writing the merged collection into the local store.
    CommitLocal,
    /// Writing the working copy and pushing it back.
    CommitRemote,
    /// The run finished with every required store updated.
    Synced,
    /// The local store was updated but the remote was not.
    RemotePending,
    /// The run stopped early; see the returned error or outcome.
    Failed,
}

impl SyncState {
    /// Returns the 1-based step number for protocol steps.
    pub fn step(&self) -> Option<usize> {
        match self {
            SyncState::Precondition => Some(1),
            SyncState::ReadLocal => Some(2),
            SyncState::MaterializeRemote => Some(3),
            SyncState::ReadRemote => Some(4),
            SyncState::Merge => Some(5),
            SyncState::CommitLocal => Some(6),
            SyncState::CommitRemote => Some(7),
            SyncState::Idle
            | SyncState::Synced
            | SyncState::RemotePending
            | SyncState::Failed => None,
        }
    }

    /// Returns true once the local commit has succeeded.
    pub fn past_durability_boundary(&self) -> bool {
        matches!(
            self,
            SyncState::CommitRemote | SyncState::Synced | SyncState::RemotePending
        )
    }
}

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A protocol step started.
    StepStarted {
        /// The step.
        state: SyncState,
        /// 1-based step number.
        step: usize,
        /// Number of steps in this run.
        total: usize,
    },
    /// The local store was confirmed free.
    LocalClear,
    /// The remote store was confirmed free.
    RemoteClear,
    /// The remote probe was skipped in local-only mode.
    RemoteProbeSkipped,
    /// A collection was read from a store.
    CollectionRead {
        /// Which store.
        side: Side,
        /// Number of records found.
        records: usize,
    },
    /// The remote store was copied into the working area.
    RemoteFetched,
    /// The collections were merged.
    Merged(MergeStats),
    /// The local store was updated.
    LocalCommitted,
    /// The remote store was updated.
    RemoteCommitted,
    /// The remote commit was skipped in local-only mode.
    RemoteCommitSkipped,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Key the collection was located under in the local store.
    pub local_key: Vec<u8>,
    /// Key the collection was located under in the remote store.
    pub remote_key: Vec<u8>,
    /// Merge counts.
    pub stats: MergeStats,
    /// Wall time of the run.
    pub duration: Duration,
}

/// Final result of a run that got past the local commit.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Both stores hold the merged collection.
    FullySynced(SyncReport),
    /// Local-only mode: the local store holds the merged collection and the
    /// remote was left untouched by design.
    LocalSynced(SyncReport),
    /// The local store holds the merged collection but updating the remote
    /// failed. Not retried; the remote needs manual attention.
    RemotePending {
        /// What was committed locally.
        report: SyncReport,
        /// Why the remote was not updated.
        error: SyncError,
    },
}

impl SyncOutcome {
    /// Returns the report of the committed local state.
    pub fn report(&self) -> &SyncReport {
        match self {
            SyncOutcome::FullySynced(report) | SyncOutcome::LocalSynced(report) => report,
            SyncOutcome::RemotePending { report, .. } => report,
        }
    }

    /// Returns true if every store the run was asked to update was updated.
    pub fn is_complete(&self) -> bool {
        !matches!(self, SyncOutcome::RemotePending { .. })
    }
}

type Observer = Box<dyn FnMut(&SyncEvent) + Send>;

/// Runs the sync protocol between a local store and a remote one.
pub struct SyncEngine<P: ProcessProbe, T: FileTransfer, O: StoreOpener> {
    config: SyncConfig,
    probe: P,
    transfer: T,
    opener: O,
    locator: RecordLocator,
    state: SyncState,
    cancelled: Arc<AtomicBool>,
    observer: Option<Observer>,
}

impl<P: ProcessProbe, T: FileTransfer, O: StoreOpener> SyncEngine<P, T, O> {
    /// Creates an engine.
    pub fn new(config: SyncConfig, probe: P, transfer: T, opener: O) -> Self {
        let locator = RecordLocator::new(config.storage_key.clone());
        Self {
            config,
            probe,
            transfer,
            opener,
            locator,
            state: SyncState::Idle,
            cancelled: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    /// Registers a callback for progress events.
    pub fn with_observer(mut self, observer: impl FnMut(&SyncEvent) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Replaces the record locator.
    pub fn with_locator(mut self, locator: RecordLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns a flag that cancels the run when set.
    ///
    /// Cancellation is honored between steps.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Cancels the run at the next step boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn emit(&mut self, event: SyncEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    /// Moves to `state`, failing if the run was cancelled.
    fn enter(&mut self, state: SyncState) -> SyncResult<()> {
        if self.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.state = state;
        if let Some(step) = state.step() {
            let total = self.config.total_steps();
            info!(step, total, ?state, "entering sync step");
            self.emit(SyncEvent::StepStarted { state, step, total });
        }
        Ok(())
    }

    /// Performs one complete run.
    ///
    /// Returns `Err` for every failure before the local commit; in that
    /// case neither store was modified. Once the local commit succeeds the
    /// run returns `Ok`, with [`SyncOutcome::RemotePending`] describing any
    /// later failure.
    ///
    /// # Errors
    ///
    /// See [`SyncError`]; every error is fatal and nothing is retried.
    pub fn run(&mut self) -> SyncResult<SyncOutcome> {
        let started = Instant::now();
        if self.state != SyncState::Idle {
            warn!(state = ?self.state, "engine reused; starting a fresh run");
        }

        let result = self.run_steps(started);
        self.state = match &result {
            Ok(SyncOutcome::RemotePending { .. }) => SyncState::RemotePending,
            Ok(_) => SyncState::Synced,
            Err(_) => SyncState::Failed,
        };
        result
    }

    fn run_steps(&mut self, started: Instant) -> SyncResult<SyncOutcome> {
        self.enter(SyncState::Precondition)?;
        self.check_processes()?;

        self.enter(SyncState::ReadLocal)?;
        let local_path = self.config.local_store.clone();
        let local = read_collection(&self.opener, &self.locator, &local_path, Side::Local)?;
        self.emit(SyncEvent::CollectionRead {
            side: Side::Local,
            records: local.collection.len(),
        });

        self.enter(SyncState::MaterializeRemote)?;
        let area = WorkingArea::create()?;
        let remote_path = area.remote_store();
        self.fetch_remote(&remote_path)?;

        self.enter(SyncState::ReadRemote)?;
        let remote = self.read_remote(&remote_path)?;

        self.enter(SyncState::Merge)?;
        let outcome = merge(&local.collection, &remote.collection);
        self.emit(SyncEvent::Merged(outcome.stats));

        self.enter(SyncState::CommitLocal)?;
        write_collection(
            &self.opener,
            &local_path,
            Some(local.key.as_slice()),
            &self.config.storage_key,
            &outcome.merged,
        )
        .map_err(SyncError::LocalCommit)?;
        info!(path = %local_path.display(), "local store updated");
        self.emit(SyncEvent::LocalCommitted);

        let report = |started: Instant| SyncReport {
            local_key: local.key.clone(),
            remote_key: remote.key.clone(),
            stats: outcome.stats,
            duration: started.elapsed(),
        };

        if self.config.local_only {
            info!("local-only mode; remote store left unchanged");
            self.emit(SyncEvent::RemoteCommitSkipped);
            return Ok(SyncOutcome::LocalSynced(report(started)));
        }

        // Past the durability boundary: failures no longer fail the run.
        match self.commit_remote(&remote_path, &remote, &outcome.merged) {
            Ok(()) => {
                self.emit(SyncEvent::RemoteCommitted);
                Ok(SyncOutcome::FullySynced(report(started)))
            }
            Err(error) => {
                warn!(%error, "local store updated but remote was not");
                Ok(SyncOutcome::RemotePending {
                    report: report(started),
                    error,
                })
            }
        }
    }

    fn check_processes(&mut self) -> SyncResult<()> {
        if !self.probe.is_clear(ProbeTarget::Local) {
            return Err(SyncError::LocalBusy);
        }
        self.emit(SyncEvent::LocalClear);

        if self.config.local_only {
            warn!(
                remote = %self.config.remote_name,
                "skipping remote process check in local-only mode; the remote store is read while possibly in use"
            );
            self.emit(SyncEvent::RemoteProbeSkipped);
            return Ok(());
        }

        if !self.probe.is_clear(ProbeTarget::Remote) {
            return Err(SyncError::RemoteBusy {
                remote: self.config.remote_name.clone(),
            });
        }
        self.emit(SyncEvent::RemoteClear);
        Ok(())
    }

    fn fetch_remote(&mut self, remote_path: &Path) -> SyncResult<()> {
        let request = TransferRequest::pull(self.config.remote_store.clone(), remote_path);
        match self.transfer.transfer(&request) {
            Ok(()) => {
                info!(remote = %self.config.remote_name, "remote store fetched");
                self.emit(SyncEvent::RemoteFetched);
                Ok(())
            }
            // An interrupt also kills the transfer child; report the cause.
            Err(_) if self.is_cancelled() => Err(SyncError::Cancelled),
            Err(err) => Err(SyncError::Fetch(err)),
        }
    }

    fn read_remote(&mut self, remote_path: &Path) -> SyncResult<LocatedRecord> {
        let remote = read_collection(&self.opener, &self.locator, remote_path, Side::Remote)
            .map_err(|err| err.on_remote(&self.config.remote_name, self.config.local_only))?;
        self.emit(SyncEvent::CollectionRead {
            side: Side::Remote,
            records: remote.collection.len(),
        });
        Ok(remote)
    }

    fn commit_remote(
        &mut self,
        remote_path: &Path,
        remote: &LocatedRecord,
        merged: &RecordCollection,
    ) -> SyncResult<()> {
        self.enter(SyncState::CommitRemote)?;
        write_collection(
            &self.opener,
            remote_path,
            Some(remote.key.as_slice()),
            &self.config.storage_key,
            merged,
        )
        .map_err(SyncError::RemoteCommit)?;

        if self.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let request = TransferRequest::push(remote_path, self.config.remote_store.clone());
        match self.transfer.transfer(&request) {
            Ok(()) => {
                info!(remote = %self.config.remote_name, "remote store updated");
                Ok(())
            }
            Err(_) if self.is_cancelled() => Err(SyncError::Cancelled),
            Err(err) => Err(SyncError::Push(err)),
        }
    }
}
