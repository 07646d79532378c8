//! CLI setup errors.

use thiserror::Error;

/// Errors raised before a sync run starts.
#[derive(Error, Debug)]
pub enum CliError {
    /// The user's config directory could not be determined.
    #[error("cannot determine the config directory; pass --local-store")]
    NoConfigDir,

    /// The Ctrl+C handler could not be installed.
    #[error("failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
