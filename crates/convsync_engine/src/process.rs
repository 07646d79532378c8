//! Thin wrappers around external programs.

use crate::error::{TransferError, TransferResult};
use std::process::{Command, Output, Stdio};
use tracing::debug;

#[must_use]
pub(crate) fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

pub(crate) fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` to completion, capturing its output.
pub(crate) fn run_command(program: &str, args: &[String]) -> TransferResult<Output> {
    if !command_exists(program) {
        return Err(TransferError::CommandMissing {
            command: program.to_owned(),
        });
    }

    debug!(command = %render(program, args), "running");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    Ok(output)
}

/// Runs `program` and fails unless it exits successfully.
pub(crate) fn run_checked(program: &str, args: &[String]) -> TransferResult<Output> {
    let output = run_command(program, args)?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(TransferError::Failed {
            command: render(program, args),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
