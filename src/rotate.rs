/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::rotate
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Bound the error log's on-disk growth by archiving oversized
    files and pruning stale rotations.

  Security / Safety Notes:
    Fresh error logs are created with owner-only permissions;
    archives inherit the original file's mode.

  Dependencies:
    chrono for archive stamps.

  Operational Scope:
    Invoked synchronously by the error handler immediately
    before each error-event append. Never runs on the activity
    log.

  Revision History:
    2025-11-20 COD  Authored rotation and retention policy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Bounded diagnostic history with deterministic pruning
    - Archive naming stable enough for operator tooling
    - Rotation and append treated as one logical sequence
============================================================*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;

use crate::error::{Result, VigilError};

const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_RETAIN_COUNT: usize = 5;

/// Size and retention rule for the error log.
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    pub max_size_bytes: u64,
    pub retain_count: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            retain_count: DEFAULT_RETAIN_COUNT,
        }
    }
}

/// Archive the file at `path` when it exceeds the policy's size cap,
/// recreate it empty, and prune archives beyond the retention count.
pub fn rotate_if_needed(path: &Path, policy: &RotationPolicy) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let size = fs::metadata(path)
        .map_err(|err| VigilError::Filesystem(format!("Failed to stat {}: {err}", path.display())))?
        .len();
    if size <= policy.max_size_bytes {
        return Ok(());
    }

    let archive = archive_target(path);
    fs::rename(path, &archive).map_err(|err| {
        VigilError::Filesystem(format!(
            "Failed to archive {} to {}: {err}",
            path.display(),
            archive.display()
        ))
    })?;

    create_fresh(path)?;
    prune_archives(path, policy.retain_count)
}

fn archive_target(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut candidate = PathBuf::from(format!("{}.{stamp}", path.display()));
    // Multiple rotations within one second must not clobber each other.
    let mut serial = 1u32;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{stamp}_{serial}", path.display()));
        serial += 1;
    }
    candidate
}

fn create_fresh(path: &Path) -> Result<()> {
    fs::File::create(path).map_err(|err| {
        VigilError::Filesystem(format!("Failed to recreate {}: {err}", path.display()))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|err| {
            VigilError::Filesystem(format!(
                "Failed to restrict permissions on {}: {err}",
                path.display()
            ))
        })?;
    }

    Ok(())
}

fn prune_archives(path: &Path, retain_count: usize) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return Ok(());
    };
    let prefix = format!("{name}.");

    let entries = fs::read_dir(parent).map_err(|err| {
        VigilError::Filesystem(format!("Failed to list {}: {err}", parent.display()))
    })?;

    let mut archives: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(suffix) = file_name.strip_prefix(&prefix) else {
            continue;
        };
        // Only timestamped rotations qualify; sibling artifacts such as
        // `<name>.hash` stay untouched.
        if !suffix.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        archives.push((modified, entry.path()));
    }

    if archives.len() <= retain_count {
        return Ok(());
    }

    archives.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let excess = archives.len() - retain_count;
    for (_, stale) in archives.into_iter().take(excess) {
        if let Err(err) = fs::remove_file(&stale) {
            eprintln!(
                "[Syn-Vigil-Core] Failed to prune archive {}: {err}",
                stale.display()
            );
        }
    }

    Ok(())
}
