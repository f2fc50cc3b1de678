/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::probe
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Run bounded external diagnostic commands on behalf of the
    snapshot, recovery, and notification layers.

  Security / Safety Notes:
    Commands execute with user privileges only; every probe is
    wrapped in a hard timeout and killed on abandonment.

  Dependencies:
    tokio::process for async command execution, tokio::time for
    probe budgets.

  Operational Scope:
    Shared invocation layer for every external tool Syn-Vigil
    touches while collecting forensic data.

  Revision History:
    2025-11-18 COD  Crafted bounded probe invocation layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Hard budgets so diagnostics cannot stall the run
    - Reusable helpers for external command diagnostics
============================================================*/

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Result, VigilError};

/// Captured output of a completed probe.
#[derive(Debug)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl ProbeOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Execute `command` with `args`, bounded by `limit`.
pub async fn run(command: &str, args: &[&str], limit: Duration) -> Result<ProbeOutput> {
    let result = timeout(
        limit,
        Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await;

    let output = match result {
        Ok(spawned) => spawned.map_err(|err| map_spawn_error(err, command))?,
        Err(_) => {
            return Err(VigilError::Runtime(format!(
                "Probe `{command}` exceeded its {}s budget",
                limit.as_secs()
            )))
        }
    };

    Ok(ProbeOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        status: output.status.code().unwrap_or(-1),
    })
}

/// Check whether an executable with the given name exists on PATH.
pub fn binary_on_path(name: &str) -> bool {
    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = Path::new(dir).join(name);
        let Ok(metadata) = std::fs::metadata(&candidate) else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 != 0 {
                return true;
            }
        }
        #[cfg(not(unix))]
        {
            return true;
        }
    }
    false
}

fn map_spawn_error(err: io::Error, command: &str) -> VigilError {
    if err.kind() == io::ErrorKind::NotFound {
        VigilError::CommandMissing {
            command: command.into(),
        }
    } else {
        VigilError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_captures_stdout() {
        let output = run("echo", &["steady"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("steady"));
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_such() {
        let err = run("synvigil-no-such-tool", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::CommandMissing { .. }));
    }

    #[tokio::test]
    async fn hung_probe_is_cut_off() {
        let err = run("sleep", &["5"], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::Runtime(_)));
    }

    #[test]
    fn path_lookup_finds_the_shell() {
        assert!(binary_on_path("sh"));
        assert!(!binary_on_path("synvigil-no-such-tool"));
    }
}
