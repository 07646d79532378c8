//! Detection of processes that hold a store open.

use crate::config::RemoteHost;
use crate::process::{render, run_command};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Which machine a probe inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTarget {
    /// This machine.
    Local,
    /// The remote host.
    Remote,
}

/// Checks whether a conflicting process may hold a store open.
///
/// Implementations must not fail: when the check itself cannot be
/// performed they log a warning and report the target as clear.
pub trait ProcessProbe {
    /// Returns true if it is safe to proceed against `target`.
    fn is_clear(&self, target: ProbeTarget) -> bool;
}

/// Probes with `pgrep -f <pattern>`, over `ssh` for the remote host.
#[derive(Debug, Clone)]
pub struct PgrepProbe {
    pattern: String,
    remote: Option<RemoteHost>,
}

impl PgrepProbe {
    /// Creates a probe looking for processes whose command line matches
    /// `pattern`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            remote: None,
        }
    }

    /// Sets the host inspected for [`ProbeTarget::Remote`].
    pub fn with_remote(mut self, remote: RemoteHost) -> Self {
        self.remote = Some(remote);
        self
    }

    fn invocation(&self, target: ProbeTarget) -> Option<(&'static str, Vec<String>)> {
        match target {
            ProbeTarget::Local => Some(("pgrep", vec!["-f".into(), self.pattern.clone()])),
            ProbeTarget::Remote => self.remote.as_ref().map(|remote| {
                (
                    "ssh",
                    vec![remote.ssh_target(), format!("pgrep -f {}", self.pattern)],
                )
            }),
        }
    }
}

impl Default for PgrepProbe {
    fn default() -> Self {
        Self::new("chrome")
    }
}

impl ProcessProbe for PgrepProbe {
    fn is_clear(&self, target: ProbeTarget) -> bool {
        let Some((program, args)) = self.invocation(target) else {
            warn!(?target, "no remote host configured; assuming no conflicting process");
            return true;
        };

        match run_command(program, &args) {
            // pgrep exits 1 when nothing matched.
            Ok(output) if !output.status.success() => {
                debug!(?target, command = %render(program, &args), "no matching processes");
                true
            }
            Ok(output) => {
                // Our own command line may carry the pattern, e.g. in a store path.
                let own = match target {
                    ProbeTarget::Local => Some(std::process::id()),
                    ProbeTarget::Remote => None,
                };
                let pids = matching_pids(&output.stdout, own);
                debug!(?target, command = %render(program, &args), ?pids, "probed processes");
                pids.is_empty()
            }
            Err(err) => {
                warn!(?target, error = %err, "could not check for running processes; assuming clear");
                true
            }
        }
    }
}

/// Parses `pgrep` output, one PID per line, leaving out `own`.
fn matching_pids(stdout: &[u8], own: Option<u32>) -> Vec<u32> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| Some(*pid) != own)
        .collect()
}

/// A probe with fixed answers, for tests.
#[derive(Debug)]
pub struct FixedProbe {
    local_clear: bool,
    remote_clear: bool,
    calls: Mutex<Vec<ProbeTarget>>,
}

impl FixedProbe {
    /// Creates a probe answering `local_clear` and `remote_clear`.
    pub fn new(local_clear: bool, remote_clear: bool) -> Self {
        Self {
            local_clear,
            remote_clear,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a probe reporting both targets clear.
    pub fn clear() -> Self {
        Self::new(true, true)
    }

    /// Returns the targets probed so far, in order.
    pub fn calls(&self) -> Vec<ProbeTarget> {
        self.calls.lock().clone()
    }
}

impl ProcessProbe for FixedProbe {
    fn is_clear(&self, target: ProbeTarget) -> bool {
        self.calls.lock().push(target);
        match target {
            ProbeTarget::Local => self.local_clear,
            ProbeTarget::Remote => self.remote_clear,
        }
    }
}

impl<P: ProcessProbe + ?Sized> ProcessProbe for &P {
    fn is_clear(&self, target: ProbeTarget) -> bool {
        (**self).is_clear(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_invocation_uses_pgrep() {
        let probe = PgrepProbe::new("chromium");
        let (program, args) = probe.invocation(ProbeTarget::Local).unwrap();
        assert_eq!(program, "pgrep");
        assert_eq!(args, vec!["-f".to_string(), "chromium".to_string()]);
    }

    #[test]
    fn remote_invocation_goes_through_ssh() {
        let probe = PgrepProbe::default().with_remote(RemoteHost::new("box").with_user("ann"));
        let (program, args) = probe.invocation(ProbeTarget::Remote).unwrap();
        assert_eq!(program, "ssh");
        assert_eq!(args, vec!["ann@box".to_string(), "pgrep -f chrome".to_string()]);
    }

    #[test]
    fn remote_without_host_is_assumed_clear() {
        let probe = PgrepProbe::default();
        assert!(probe.invocation(ProbeTarget::Remote).is_none());
        assert!(probe.is_clear(ProbeTarget::Remote));
    }

    #[test]
    fn own_pid_is_not_a_match() {
        let stdout = b"4121\n977\n\n";
        assert_eq!(matching_pids(stdout, Some(977)), vec![4121]);
        assert_eq!(matching_pids(stdout, None), vec![4121, 977]);
        assert!(matching_pids(b"977\n", Some(977)).is_empty());
    }

    #[test]
    fn pattern_in_own_command_line_is_clear() {
        // Only this test process carries its own executable path.
        let Some(own_argv0) = std::env::args().next() else {
            return;
        };
        let probe = PgrepProbe::new(own_argv0);
        assert!(probe.is_clear(ProbeTarget::Local));
    }

    #[test]
    fn fixed_probe_records_calls() {
        let probe = FixedProbe::new(true, false);
        assert!(probe.is_clear(ProbeTarget::Local));
        assert!(!probe.is_clear(ProbeTarget::Remote));
        assert_eq!(probe.calls(), vec![ProbeTarget::Local, ProbeTarget::Remote]);
    }
}
