//! convsync CLI
//!
//! Merges the extension's saved threads between this machine's browser
//! profile and the same profile on a remote host, then writes the merged
//! set back to both.
//!
//! The browser must be closed on both machines. Exit codes:
//!
//! - `0` - both stores (or the local store, with `--local-only`) updated
//! - `1` - the sync failed; neither store was modified
//! - `2` - the local store was updated but the remote was not
//! - `130` - interrupted with Ctrl+C

mod error;
mod progress;

use clap::Parser;
use convsync_core::DEFAULT_STORAGE_KEY;
use convsync_engine::{
    FileTransfer, LocalCopyTransfer, PgrepProbe, RemoteHost, RsyncTransfer, StoreLayout,
    SyncConfig, SyncEngine, SyncError, SyncOutcome,
};
use convsync_storage::LevelDbOpener;
use error::CliError;
use progress::Progress;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::error;
use tracing_subscriber::EnvFilter;

const EXIT_FAILED: u8 = 1;
const EXIT_REMOTE_PENDING: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

/// Sync saved extension threads with another machine.
#[derive(Parser, Debug)]
#[command(name = "convsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Remote host to sync with
    #[arg(long, required_unless_present = "remote_store")]
    remote_host: Option<String>,

    /// Login user on the remote host
    #[arg(long, requires = "remote_host")]
    remote_user: Option<String>,

    /// Browser profile directory name
    #[arg(long, default_value = "Default")]
    profile: String,

    /// Update only the local store
    #[arg(long)]
    local_only: bool,

    /// Local store directory (default: resolved from the profile)
    #[arg(long)]
    local_store: Option<PathBuf>,

    /// Remote store path (default: resolved from the profile); without
    /// --remote-host it is a local directory, e.g. a mounted profile
    #[arg(long)]
    remote_store: Option<String>,

    /// Logical storage key the extension writes threads under
    #[arg(long, default_value = DEFAULT_STORAGE_KEY)]
    storage_key: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn remote(&self) -> Option<RemoteHost> {
        self.remote_host.as_ref().map(|host| {
            let remote = RemoteHost::new(host);
            match &self.remote_user {
                Some(user) => remote.with_user(user),
                None => remote,
            }
        })
    }

    fn config(&self) -> Result<SyncConfig, CliError> {
        let layout = StoreLayout::new(&self.profile);
        let local_store = match &self.local_store {
            Some(path) => path.clone(),
            None => layout.local_store().ok_or(CliError::NoConfigDir)?,
        };
        let remote_store = self
            .remote_store
            .clone()
            .unwrap_or_else(|| layout.remote_store());
        let remote_name = match self.remote() {
            Some(remote) => remote.to_string(),
            None => remote_store.clone(),
        };

        Ok(SyncConfig::new(local_store, remote_store)
            .with_remote_name(remote_name)
            .with_local_only(self.local_only)
            .with_storage_key(&self.storage_key))
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;
    let remote = cli.remote();

    println!("convsync v{}", env!("CARGO_PKG_VERSION"));
    println!("  Local:  {}", config.local_store.display());
    println!("  Remote: {}", config.remote_name);
    if config.local_only {
        println!("  Mode:   local only");
    }
    println!();

    let mut probe = PgrepProbe::default();
    if let Some(remote) = &remote {
        probe = probe.with_remote(remote.clone());
    }
    let transfer: Box<dyn FileTransfer> = match &remote {
        Some(remote) => Box::new(RsyncTransfer::new(Some(remote.clone()))),
        None => Box::new(LocalCopyTransfer),
    };

    let progress = Progress::new(config.remote_name.clone());
    let mut engine = SyncEngine::new(config, probe, transfer.as_ref(), LevelDbOpener)
        .with_observer(move |event| {
            if let Some(line) = progress.line(event) {
                println!("{line}");
            }
        });

    let cancel = engine.cancel_flag();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
        tracing::info!("interrupt received; stopping at the next step");
    })
    .map_err(CliError::from)?;

    let code = match engine.run() {
        Ok(SyncOutcome::FullySynced(report)) => {
            println!();
            println!("✓ Sync complete in {:.1?}", report.duration);
            ExitCode::SUCCESS
        }
        Ok(SyncOutcome::LocalSynced(report)) => {
            println!();
            println!("✓ Local store synced in {:.1?}; remote left unchanged", report.duration);
            ExitCode::SUCCESS
        }
        Ok(SyncOutcome::RemotePending { error, .. }) => {
            println!();
            error!(%error, "remote store not updated");
            eprintln!("✗ Local store updated, but the remote was not: {error}");
            print_hint(&error);
            ExitCode::from(EXIT_REMOTE_PENDING)
        }
        Err(SyncError::Cancelled) => {
            eprintln!("✗ Sync cancelled; no store was modified");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(error) => {
            error!(%error, "sync failed");
            eprintln!("✗ {error}");
            if error.is_store_missing() {
                eprintln!("  Is the extension installed in profile \"{}\"?", cli.profile);
            }
            print_hint(&error);
            ExitCode::from(EXIT_FAILED)
        }
    };

    Ok(code)
}

fn print_hint(error: &SyncError) {
    if let Some(hint) = error.hint() {
        eprintln!("  Hint: {hint}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_host_is_required_without_remote_store() {
        assert!(Cli::try_parse_from(["convsync"]).is_err());
        assert!(Cli::try_parse_from(["convsync", "--remote-store", "/mnt/box/store"]).is_ok());
    }

    #[test]
    fn remote_user_requires_host() {
        let result = Cli::try_parse_from(["convsync", "--remote-store", "/x", "--remote-user", "ann"]);
        assert!(result.is_err());
    }

    #[test]
    fn config_from_explicit_paths() {
        let cli = Cli::try_parse_from([
            "convsync",
            "--remote-host",
            "box",
            "--remote-user",
            "ann",
            "--local-store",
            "/home/ann/store",
            "--remote-store",
            "~/store",
            "--local-only",
        ])
        .unwrap();

        let config = cli.config().unwrap();
        assert_eq!(config.local_store, PathBuf::from("/home/ann/store"));
        assert_eq!(config.remote_store, "~/store");
        assert_eq!(config.remote_name, "ann@box");
        assert!(config.local_only);
        assert_eq!(config.storage_key, "threads");
    }

    #[test]
    fn remote_store_defaults_to_profile_path() {
        let cli = Cli::try_parse_from([
            "convsync",
            "--remote-host",
            "box",
            "--profile",
            "Profile 2",
            "--local-store",
            "/s",
        ])
        .unwrap();

        let config = cli.config().unwrap();
        assert_eq!(config.remote_store, StoreLayout::new("Profile 2").remote_store());
        assert_eq!(config.remote_name, "box");
    }

    #[test]
    fn mounted_remote_is_named_by_path() {
        let cli =
            Cli::try_parse_from(["convsync", "--remote-store", "/mnt/box", "--local-store", "/s"])
                .unwrap();

        assert!(cli.remote().is_none());
        assert_eq!(cli.config().unwrap().remote_name, "/mnt/box");
    }
}
