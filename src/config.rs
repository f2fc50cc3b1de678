/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load and resolve the immutable Syn-Vigil-Core configuration
    from its TOML file and the recognized environment overlay.

  Security / Safety Notes:
    Configuration is read from operator-controlled paths only;
    values are never logged verbatim beyond resolved paths.

  Dependencies:
    serde/toml for file parsing, dirs for default locations.

  Operational Scope:
    Constructed once at startup and passed by reference to every
    component; no ambient mutable configuration exists.

  Revision History:
    2025-11-19 COD  Authored configuration surface.
    2025-12-02 COD  Exposed guard thresholds and probe budget.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Single immutable configuration object per run
    - Environment overlay for the Bash provisioning layer
    - Explicit rejection of malformed operator input
============================================================*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VigilError};
use crate::logger::LogLevel;
use crate::rotate::RotationPolicy;

/// Top-level configuration for Syn-Vigil-Core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub logging: LoggingConfig,
    pub diagnostics: DiagnosticsConfig,
    pub guard: GuardConfig,
    pub snapshot: SnapshotConfig,
    pub notify: NotifyConfig,
}

/// Activity-log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_file: Option<PathBuf>,
    pub min_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            min_level: "INFO".to_string(),
        }
    }
}

/// Error-log and snapshot-artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub error_log: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub retain_count: usize,
    pub state_dir: Option<PathBuf>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            error_log: None,
            max_size_bytes: 10 * 1024 * 1024,
            retain_count: 5,
            state_dir: None,
        }
    }
}

/// Resource-exhaustion thresholds, in KiB of free space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub min_free_memory_kib: u64,
    pub min_free_disk_kib: u64,
    pub monitored_path: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_free_memory_kib: 1024 * 1024,
            min_free_disk_kib: 102_400,
            monitored_path: PathBuf::from("/"),
        }
    }
}

/// State-snapshot probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub probe_timeout_secs: u64,
    pub syslog_path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 10,
            syslog_path: PathBuf::from("/var/log/messages"),
        }
    }
}

/// Administrator-notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub recipient: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recipient: "root".to_string(),
        }
    }
}

impl VigilConfig {
    /// Load configuration from an explicit path, or from the default
    /// location when none is given, then apply the environment overlay.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overlay()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            VigilError::Config(format!("Failed to read config {}: {err}", path.display()))
        })?;
        toml::from_str(&text).map_err(|err| {
            VigilError::Config(format!("Failed to parse config {}: {err}", path.display()))
        })
    }

    fn apply_env_overlay(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(value));
        }
        if let Ok(value) = std::env::var("MIN_LOG_LEVEL") {
            self.logging.min_level = value;
        }
        if let Ok(value) = std::env::var("ERROR_LOG") {
            self.diagnostics.error_log = Some(PathBuf::from(value));
        }
        if let Ok(value) = std::env::var("ERROR_LOG_MAX_SIZE") {
            self.diagnostics.max_size_bytes = value.parse().map_err(|err| {
                VigilError::Config(format!("Invalid ERROR_LOG_MAX_SIZE `{value}`: {err}"))
            })?;
        }
        if let Ok(value) = std::env::var("RETAIN_COUNT") {
            self.diagnostics.retain_count = value.parse().map_err(|err| {
                VigilError::Config(format!("Invalid RETAIN_COUNT `{value}`: {err}"))
            })?;
        }
        Ok(())
    }

    /// Resolved activity-log path.
    pub fn log_file(&self) -> PathBuf {
        self.logging
            .log_file
            .clone()
            .unwrap_or_else(|| base_dir().join("vigil.log"))
    }

    /// Resolved error-log path.
    pub fn error_log(&self) -> PathBuf {
        self.diagnostics
            .error_log
            .clone()
            .unwrap_or_else(|| base_dir().join("error.log"))
    }

    /// Resolved directory for state-snapshot artifacts.
    pub fn state_dir(&self) -> PathBuf {
        self.diagnostics
            .state_dir
            .clone()
            .unwrap_or_else(|| base_dir().join("state"))
    }

    /// Parse the configured minimum log level.
    pub fn min_level(&self) -> Result<LogLevel> {
        self.logging.min_level.parse()
    }

    /// Rotation policy for the error log.
    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_size_bytes: self.diagnostics.max_size_bytes,
            retain_count: self.diagnostics.retain_count,
        }
    }

    /// Budget applied to each external diagnostic probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot.probe_timeout_secs)
    }
}

fn base_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/var/tmp"))
        .join("syn-vigil")
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("syn-vigil")
        .join("vigil.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = VigilConfig::default();
        assert_eq!(config.logging.min_level, "INFO");
        assert_eq!(config.diagnostics.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.diagnostics.retain_count, 5);
        assert_eq!(config.guard.min_free_memory_kib, 1024 * 1024);
        assert_eq!(config.guard.min_free_disk_kib, 102_400);
        assert_eq!(config.snapshot.probe_timeout_secs, 10);
        assert!(config.notify.enabled);
        assert_eq!(config.notify.recipient, "root");
        assert_eq!(config.min_level().unwrap(), LogLevel::Info);
    }

    #[test]
    fn partial_toml_fills_the_rest_from_defaults() {
        let text = r#"
            [logging]
            min_level = "DEBUG"

            [diagnostics]
            max_size_bytes = 2048

            [notify]
            enabled = false
        "#;
        let config: VigilConfig = toml::from_str(text).unwrap();
        assert_eq!(config.min_level().unwrap(), LogLevel::Debug);
        assert_eq!(config.diagnostics.max_size_bytes, 2048);
        assert_eq!(config.diagnostics.retain_count, 5);
        assert!(!config.notify.enabled);
        assert_eq!(config.guard.min_free_disk_kib, 102_400);
    }

    // One test owns every overlay variable; splitting it would let the
    // parallel test runner interleave conflicting process environments.
    #[test]
    fn environment_overlay_wins_and_rejects_malformed_values() {
        std::env::set_var("LOG_FILE", "/tmp/overlay-vigil.log");
        std::env::set_var("MIN_LOG_LEVEL", "WARN");
        std::env::set_var("ERROR_LOG", "/tmp/overlay-error.log");
        std::env::set_var("ERROR_LOG_MAX_SIZE", "4096");
        std::env::set_var("RETAIN_COUNT", "3");

        let mut config = VigilConfig::default();
        let overlay = config.apply_env_overlay();

        std::env::set_var("ERROR_LOG_MAX_SIZE", "ten-megabytes");
        let mut rejected = VigilConfig::default();
        let malformed = rejected.apply_env_overlay();

        std::env::remove_var("LOG_FILE");
        std::env::remove_var("MIN_LOG_LEVEL");
        std::env::remove_var("ERROR_LOG");
        std::env::remove_var("ERROR_LOG_MAX_SIZE");
        std::env::remove_var("RETAIN_COUNT");

        overlay.unwrap();
        assert_eq!(config.log_file(), PathBuf::from("/tmp/overlay-vigil.log"));
        assert_eq!(config.min_level().unwrap(), LogLevel::Warn);
        assert_eq!(config.error_log(), PathBuf::from("/tmp/overlay-error.log"));
        assert_eq!(config.diagnostics.max_size_bytes, 4096);
        assert_eq!(config.diagnostics.retain_count, 3);
        assert!(matches!(malformed, Err(VigilError::Config(_))));
    }
}
