/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Provide the severity-filtered, append-only activity logger
    for Syn-Vigil-Core and the Bash provisioning layer above it.

  Security / Safety Notes:
    The logger is fail-safe: sink failures degrade to stderr
    diagnostics and never propagate into the host run.

  Dependencies:
    std::fs::File, std::sync::Mutex, chrono for timestamps,
    owo-colors for console styling, sha2 for integrity hashing.

  Operational Scope:
    Used by every runtime component to emit wall-clock stamped
    records and to seal the session log with a digest.

  Revision History:
    2025-11-18 COD  Established logging module for Syn-Vigil-Core.
    2025-12-02 COD  Added minimum-level filter and console styling.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with wall-clock timestamps
    - Deterministic formatting for auditability
    - Graceful degradation on I/O failures
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::Local;
use owo_colors::OwoColorize;
use sha2::{Digest, Sha256};

use crate::error::{Result, VigilError};

/// Ordered severity for Syn-Vigil-Core records.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum LogLevel {
    Debug = 10,
    Info = 20,
    Warn = 30,
    Error = 40,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn paint(self, line: &str) -> String {
        match self {
            LogLevel::Debug => line.blue().to_string(),
            LogLevel::Info => line.green().to_string(),
            LogLevel::Warn => line.yellow().to_string(),
            LogLevel::Error => line.red().to_string(),
        }
    }
}

impl FromStr for LogLevel {
    type Err = VigilError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(VigilError::Config(format!("Unknown log level `{other}`"))),
        }
    }
}

/// Format a record exactly as it appears in the log files.
pub fn format_record(level: LogLevel, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{timestamp}] [{}] {message}", level.as_str())
}

/// Severity-filtered logger writing to a file sink and, when the
/// minimum level is lowered to DEBUG, to a colored console echo.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    min_level: LogLevel,
}

impl Logger {
    /// Build a logger for the given sink. A sink that cannot be opened
    /// degrades to stderr output instead of failing the host run.
    pub fn new(path: Option<PathBuf>, min_level: LogLevel) -> Self {
        let file = path.as_ref().and_then(|file_path| match open_sink(file_path) {
            Ok(file) => Some(Mutex::new(BufWriter::new(file))),
            Err(err) => {
                eprintln!(
                    "[Syn-Vigil-Core] Log sink {} unavailable ({err}); continuing on stderr",
                    file_path.display()
                );
                None
            }
        });

        Self {
            file,
            path,
            min_level,
        }
    }

    /// Emit a record at the given level. Records below the configured
    /// minimum are no-ops. Returns false when the sink rejected the
    /// record; the failure is reported on stderr and never propagated.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, message: S) -> bool {
        if level < self.min_level {
            return true;
        }

        let payload = format_record(level, message.as_ref());

        if self.min_level == LogLevel::Debug {
            eprintln!("{}", level.paint(&payload));
        }

        match &self.file {
            Some(file) => {
                let Ok(mut guard) = file.lock() else {
                    return false;
                };
                if writeln!(guard, "{payload}").is_err() || guard.flush().is_err() {
                    eprintln!("[Syn-Vigil-Core] Failed to append log record: {payload}");
                    return false;
                }
                true
            }
            None => {
                if self.min_level != LogLevel::Debug {
                    eprintln!("{payload}");
                }
                false
            }
        }
    }

    /// Convenience wrapper for `INFO` level records.
    pub fn info<S: AsRef<str>>(&self, message: S) {
        self.log(LogLevel::Info, message);
    }

    /// Convenience wrapper for `WARN` level records.
    pub fn warn<S: AsRef<str>>(&self, message: S) {
        self.log(LogLevel::Warn, message);
    }

    /// Convenience wrapper for `ERROR` level records.
    pub fn error<S: AsRef<str>>(&self, message: S) {
        self.log(LogLevel::Error, message);
    }

    /// Convenience wrapper for `DEBUG` level records.
    pub fn debug<S: AsRef<str>>(&self, message: S) {
        self.log(LogLevel::Debug, message);
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist a SHA-256 digest of the log file.
    pub fn finalize(&self) -> Result<()> {
        if let Some(path) = self.path() {
            if !path.exists() {
                return Ok(());
            }
            let data = std::fs::read(path).map_err(|err| {
                VigilError::Filesystem(format!(
                    "Failed to read log for hashing {}: {err}",
                    path.display()
                ))
            })?;
            let mut hasher = Sha256::new();
            hasher.update(&data);
            let digest = hasher.finalize();
            let mut hash_os = path.as_os_str().to_os_string();
            hash_os.push(".hash");
            let hash_path = PathBuf::from(hash_os);
            let mut file = File::create(&hash_path).map_err(|err| {
                VigilError::Filesystem(format!(
                    "Failed to create hash file {}: {err}",
                    hash_path.display()
                ))
            })?;
            writeln!(
                file,
                "{:x}  {}",
                digest,
                path.file_name().unwrap_or_default().to_string_lossy()
            )
            .map_err(|err| {
                VigilError::Filesystem(format!(
                    "Failed to write hash file {}: {err}",
                    hash_path.display()
                ))
            })?;
        }
        Ok(())
    }
}

fn open_sink(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("ERROR".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("chatty".parse::<LogLevel>().is_err());
    }

    #[test]
    fn records_carry_the_wire_format() {
        let record = format_record(LogLevel::Info, "pkg set complete");
        assert!(record.starts_with('['));
        assert!(record.contains("] [INFO] pkg set complete"));
        // [YYYY-MM-DD HH:MM:SS] is a fixed 21-character prefix.
        assert_eq!(&record[21..28], " [INFO]");
    }

    #[test]
    fn minimum_level_filter_is_total() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.log");
        let logger = Logger::new(Some(path.clone()), LogLevel::Error);

        assert!(logger.log(LogLevel::Info, "routine step"));
        assert!(logger.log(LogLevel::Error, "broken step"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("routine step"));
        assert!(text.contains("[ERROR] broken step"));
    }

    #[test]
    fn default_minimum_admits_info_and_above() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.log");
        let logger = Logger::new(Some(path.clone()), LogLevel::Info);

        logger.debug("hidden");
        logger.info("shown");
        logger.warn("also shown");

        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("hidden"));
        assert!(text.contains("[INFO] shown"));
        assert!(text.contains("[WARN] also shown"));
    }

    #[test]
    fn sink_parent_directory_is_created_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("vigil.log");
        let logger = Logger::new(Some(path.clone()), LogLevel::Info);

        assert!(logger.log(LogLevel::Info, "first record"));
        assert!(path.exists());
    }

    #[test]
    fn finalize_writes_a_digest_beside_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.log");
        let logger = Logger::new(Some(path.clone()), LogLevel::Info);

        logger.info("one record");
        logger.finalize().unwrap();

        let hash_path = dir.path().join("vigil.log.hash");
        let digest = fs::read_to_string(hash_path).unwrap();
        assert!(digest.contains("vigil.log"));
        assert_eq!(digest.split_whitespace().next().unwrap().len(), 64);
    }
}
