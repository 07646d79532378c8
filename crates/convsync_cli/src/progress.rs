//! Operator-facing progress output.

use convsync_engine::{Side, SyncEvent, SyncState};

/// Renders engine events as the lines printed to stdout.
pub struct Progress {
    remote: String,
}

impl Progress {
    /// Creates a renderer naming `remote` in transfer steps.
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }

    /// Returns the line for `event`, if it has one.
    pub fn line(&self, event: &SyncEvent) -> Option<String> {
        let line = match event {
            SyncEvent::StepStarted { state, step, total } => {
                format!("[{step}/{total}] {}", self.describe(*state))
            }
            SyncEvent::LocalClear => "  ✓ No browser running locally".to_string(),
            SyncEvent::RemoteClear => format!("  ✓ No browser running on {}", self.remote),
            SyncEvent::RemoteProbeSkipped => {
                "  ! Skipped remote check (local-only mode)".to_string()
            }
            SyncEvent::CollectionRead { side, records } => {
                format!("  ✓ Found {records} {side} threads")
            }
            SyncEvent::RemoteFetched => "  ✓ Remote store copied".to_string(),
            SyncEvent::Merged(stats) => format!(
                "  ✓ {} threads after merge ({} added from remote, {} updated)",
                stats.merged, stats.added, stats.updated
            ),
            SyncEvent::LocalCommitted => "  ✓ Local store updated".to_string(),
            SyncEvent::RemoteCommitted => format!("  ✓ Store on {} updated", self.remote),
            SyncEvent::RemoteCommitSkipped => return None,
        };
        Some(line)
    }

    fn describe(&self, state: SyncState) -> String {
        match state {
            SyncState::Precondition => "Checking for running browsers...".to_string(),
            SyncState::ReadLocal => format!("Reading {} store...", Side::Local),
            SyncState::MaterializeRemote => format!("Fetching store from {}...", self.remote),
            SyncState::ReadRemote => format!("Reading {} store...", Side::Remote),
            SyncState::Merge => "Merging threads...".to_string(),
            SyncState::CommitLocal => format!("Writing {} store...", Side::Local),
            SyncState::CommitRemote => format!("Pushing store to {}...", self.remote),
            SyncState::Idle
            | SyncState::Synced
            | SyncState::RemotePending
            | SyncState::Failed => format!("{state:?}"),
        }
    }
}
