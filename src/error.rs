/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Vigil-Core error types to provide consistent
    diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts expose high-level paths only; command stderr
    is trimmed before inclusion.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2025-11-18 COD  Established shared error definitions.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths above the handler boundary
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Syn-Vigil-Core operations.
pub type Result<T> = std::result::Result<T, VigilError>;

/// Enumerates high-level error domains surfaced by Syn-Vigil-Core.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl VigilError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            VigilError::CommandMissing { .. } => ExitCode::from(10),
            VigilError::CommandFailure { .. } => ExitCode::from(11),
            VigilError::Config(_) => ExitCode::from(20),
            VigilError::Serialization(_) => ExitCode::from(31),
            VigilError::Filesystem(_) => ExitCode::from(40),
            VigilError::Io(_) => ExitCode::from(41),
            VigilError::Runtime(_) => ExitCode::from(50),
        }
    }
}
