/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::guard
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Detect critically low free memory or disk at failure time
    and escalate with an emergency state capture.

  Security / Safety Notes:
    Readings come from the kernel via sysinfo; no external
    commands are executed for the check itself.

  Dependencies:
    sysinfo for memory and filesystem statistics.

  Operational Scope:
    Runs once per trapped error, after the stack trace and the
    error-labeled snapshot have been written.

  Revision History:
    2025-11-21 COD  Authored resource guard.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Pure threshold evaluation split from impure gathering
    - Escalation is additive context, not a replacement
    - Configurable thresholds, no guessed constants
============================================================*/

use std::path::Path;

use sysinfo::{Disks, System};

use crate::config::{GuardConfig, SnapshotConfig};
use crate::logger::Logger;
use crate::snapshot::{self, SnapshotLabel};

/// Outcome of the resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceVerdict {
    Ok,
    Critical,
}

/// Free-resource readings at failure time, in KiB.
#[derive(Debug, Clone, Copy)]
pub struct ResourceReadings {
    pub free_memory_kib: u64,
    pub free_disk_kib: u64,
}

/// Read free memory and free disk for the monitored filesystem.
pub fn gather_readings(monitored_path: &Path) -> ResourceReadings {
    let mut system = System::new();
    system.refresh_memory();
    let free_memory_kib = system.available_memory() / 1024;

    let disks = Disks::new_with_refreshed_list();
    // The disk whose mount point is the longest prefix of the monitored
    // path owns that filesystem; an unmatched path is unconstrained.
    let mut best: Option<(usize, u64)> = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if monitored_path.starts_with(mount) {
            let depth = mount.as_os_str().len();
            if best.map(|(seen, _)| depth >= seen).unwrap_or(true) {
                best = Some((depth, disk.available_space() / 1024));
            }
        }
    }

    ResourceReadings {
        free_memory_kib,
        free_disk_kib: best.map(|(_, kib)| kib).unwrap_or(u64::MAX),
    }
}

/// Compare readings against the configured minimums.
pub fn evaluate(readings: ResourceReadings, config: &GuardConfig) -> ResourceVerdict {
    if readings.free_memory_kib < config.min_free_memory_kib
        || readings.free_disk_kib < config.min_free_disk_kib
    {
        ResourceVerdict::Critical
    } else {
        ResourceVerdict::Ok
    }
}

/// Escalate a breached threshold: ERROR record plus one emergency
/// state capture labeled by the triggering event's id.
pub async fn escalate(
    readings: ResourceReadings,
    event_id: &str,
    config: &GuardConfig,
    snapshot_config: &SnapshotConfig,
    state_dir: &Path,
    logger: &Logger,
) -> ResourceVerdict {
    if evaluate(readings, config) == ResourceVerdict::Ok {
        return ResourceVerdict::Ok;
    }

    logger.error(format!(
        "Resource exhaustion detected: free memory {} KiB (minimum {}), free disk {} KiB (minimum {})",
        readings.free_memory_kib,
        config.min_free_memory_kib,
        readings.free_disk_kib,
        config.min_free_disk_kib
    ));

    let label = SnapshotLabel::Emergency(event_id.to_string());
    match snapshot::capture(&label, state_dir, snapshot_config).await {
        Ok(path) => logger.error(format!("Emergency state captured to {}", path.display())),
        Err(err) => logger.warn(format!("Emergency state capture failed: {err}")),
    }

    ResourceVerdict::Critical
}

/// Gather live readings and escalate if a threshold is breached.
pub async fn check_and_escalate(
    event_id: &str,
    config: &GuardConfig,
    snapshot_config: &SnapshotConfig,
    state_dir: &Path,
    logger: &Logger,
) -> ResourceVerdict {
    let readings = gather_readings(&config.monitored_path);
    escalate(
        readings,
        event_id,
        config,
        snapshot_config,
        state_dir,
        logger,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use std::fs;

    fn thresholds() -> GuardConfig {
        GuardConfig {
            min_free_memory_kib: 1024,
            min_free_disk_kib: 102_400,
            monitored_path: "/".into(),
        }
    }

    #[test]
    fn healthy_readings_pass() {
        let readings = ResourceReadings {
            free_memory_kib: 2048,
            free_disk_kib: 204_800,
        };
        assert_eq!(evaluate(readings, &thresholds()), ResourceVerdict::Ok);
    }

    #[test]
    fn either_breach_is_critical() {
        let low_memory = ResourceReadings {
            free_memory_kib: 512,
            free_disk_kib: 204_800,
        };
        assert_eq!(evaluate(low_memory, &thresholds()), ResourceVerdict::Critical);

        let low_disk = ResourceReadings {
            free_memory_kib: 2048,
            free_disk_kib: 1024,
        };
        assert_eq!(evaluate(low_disk, &thresholds()), ResourceVerdict::Critical);
    }

    #[test]
    fn live_readings_are_plausible() {
        let readings = gather_readings(Path::new("/"));
        assert!(readings.free_memory_kib > 0);
    }

    #[tokio::test]
    async fn breach_produces_exactly_one_emergency_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(None, LogLevel::Error);
        let readings = ResourceReadings {
            free_memory_kib: 0,
            free_disk_kib: 0,
        };

        let verdict = escalate(
            readings,
            "guard_test",
            &thresholds(),
            &SnapshotConfig::default(),
            dir.path(),
            &logger,
        )
        .await;

        assert_eq!(verdict, ResourceVerdict::Critical);
        let emergencies: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("emergency_guard_test") && name.ends_with(".state"))
            .collect();
        assert_eq!(emergencies.len(), 1);
    }

    #[tokio::test]
    async fn healthy_readings_skip_escalation() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(None, LogLevel::Error);
        let readings = ResourceReadings {
            free_memory_kib: u64::MAX,
            free_disk_kib: u64::MAX,
        };

        let verdict = escalate(
            readings,
            "guard_test",
            &thresholds(),
            &SnapshotConfig::default(),
            dir.path(),
            &logger,
        )
        .await;

        assert_eq!(verdict, ResourceVerdict::Ok);
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
