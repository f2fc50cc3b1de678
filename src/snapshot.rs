/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::snapshot
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Capture a point-in-time system diagnostic bundle for one
    error event or resource emergency.

  Security / Safety Notes:
    Probes are read-only system inspections executed with user
    privileges; no privileged escalation is attempted.

  Dependencies:
    tokio::process via the probe layer, libc for rlimits.

  Operational Scope:
    Invoked for every trapped error, by the resource guard for
    emergency captures, and by operators via the CLI.

  Revision History:
    2025-11-21 COD  Authored snapshot capture pipeline.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Independent fallible probes, assembled from what succeeded
    - Absent tools omitted rather than fatal
    - Snapshot artifacts are write-once
============================================================*/

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;

use crate::config::SnapshotConfig;
use crate::error::{Result, VigilError};
use crate::probe;

/// Labels a capture and determines its artifact name.
#[derive(Debug, Clone)]
pub enum SnapshotLabel {
    Error(String),
    Emergency(String),
}

impl SnapshotLabel {
    pub fn file_name(&self) -> String {
        match self {
            SnapshotLabel::Error(id) => format!("state_{id}.log"),
            SnapshotLabel::Emergency(id) => format!("emergency_{id}.state"),
        }
    }

    fn describe(&self) -> String {
        match self {
            SnapshotLabel::Error(id) => format!("error {id}"),
            SnapshotLabel::Emergency(id) => format!("emergency {id}"),
        }
    }
}

/// Capture a state snapshot into `state_dir` and return the artifact
/// path. Each data source is probed independently and best-effort.
pub async fn capture(
    label: &SnapshotLabel,
    state_dir: &Path,
    config: &SnapshotConfig,
) -> Result<PathBuf> {
    fs::create_dir_all(state_dir).map_err(|err| {
        VigilError::Filesystem(format!(
            "Failed to create state directory {}: {err}",
            state_dir.display()
        ))
    })?;

    let limit = Duration::from_secs(config.probe_timeout_secs);
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());

    let mut document = String::new();
    let _ = writeln!(document, "Syn-Vigil state snapshot ({})", label.describe());
    let _ = writeln!(
        document,
        "Captured: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(document, "Host: {host}");
    document.push('\n');

    push_section(&mut document, "Identification", identification(limit).await);
    push_section(
        &mut document,
        "Memory",
        first_probe(&[&["vmstat", "-s"], &["free", "-k"]], limit).await,
    );
    push_section(
        &mut document,
        "Processes",
        first_probe(&[&["ps", "aux"]], limit).await,
    );
    push_section(&mut document, "Descriptor limits", descriptor_limits());
    push_section(
        &mut document,
        "Network connections",
        first_probe(&[&["netstat", "-an"], &["ss", "-an"]], limit).await,
    );
    push_section(
        &mut document,
        "System log tail",
        syslog_tail(&config.syslog_path, limit).await,
    );
    push_section(
        &mut document,
        "Mounts",
        first_probe(&[&["mount"]], limit).await,
    );
    push_section(
        &mut document,
        "Open files",
        first_probe(&[&["fstat"], &["lsof"]], limit).await,
    );

    let path = state_dir.join(label.file_name());
    fs::write(&path, document).map_err(|err| {
        VigilError::Filesystem(format!(
            "Failed to write snapshot {}: {err}",
            path.display()
        ))
    })?;
    Ok(path)
}

fn push_section(document: &mut String, title: &str, body: Option<String>) {
    let Some(body) = body else {
        return;
    };
    let _ = writeln!(document, "==== {title} ====");
    document.push_str(body.trim_end());
    document.push_str("\n\n");
}

async fn identification(limit: Duration) -> Option<String> {
    let mut lines = Vec::new();
    if let Ok(output) = probe::run("uname", &["-a"], limit).await {
        if output.success() {
            lines.push(output.stdout.trim().to_string());
        }
    }
    if let Ok(output) = probe::run("uptime", &[], limit).await {
        if output.success() {
            lines.push(output.stdout.trim().to_string());
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Try each candidate command in order; the first one that exists and
/// succeeds supplies the section body.
async fn first_probe(candidates: &[&[&str]], limit: Duration) -> Option<String> {
    for candidate in candidates {
        let Some((command, args)) = candidate.split_first() else {
            continue;
        };
        match probe::run(command, args, limit).await {
            Ok(output) if output.success() && !output.stdout.trim().is_empty() => {
                return Some(output.stdout)
            }
            _ => continue,
        }
    }
    None
}

fn descriptor_limits() -> Option<String> {
    let mut limits = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limits) };
    if rc != 0 {
        return None;
    }
    Some(format!(
        "open files: soft={} hard={}",
        limits.rlim_cur, limits.rlim_max
    ))
}

async fn syslog_tail(path: &Path, limit: Duration) -> Option<String> {
    let target = path.to_string_lossy().into_owned();
    match probe::run("tail", &["-n", "10", target.as_str()], limit).await {
        Ok(output) if output.success() && !output.stdout.trim().is_empty() => Some(output.stdout),
        _ => None,
    }
}
