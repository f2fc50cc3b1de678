/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::event
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing one trapped provisioning
    failure, and the generator for its traceable identifier.

  Security / Safety Notes:
    Identifiers embed hostname and clock only; no command
    arguments or environment values leak into them.

  Dependencies:
    serde for the persisted event record, hostname and rand for
    identifier construction.

  Operational Scope:
    The event id is the join key between the error log entry,
    the stack-trace block, and the state-snapshot artifact.

  Revision History:
    2025-11-19 COD  Introduced failure event structures.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Write-once event records, append-only persistence
    - Collision-resistant identifiers per failure occurrence
    - Clear data contracts between modules
============================================================*/

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Local;
use serde::Serialize;

use crate::recovery::CommandCategory;

/// One occurrence of a trapped provisioning failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub id: String,
    pub timestamp: String,
    pub failing_command: String,
    pub exit_code: i32,
    pub line_number: u32,
    pub function_name: String,
    pub process_id: u32,
}

impl ErrorEvent {
    /// Stamp a fresh event for the given failure context.
    pub fn from_context(ctx: &FailureContext) -> Self {
        Self {
            id: new_error_id(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            failing_command: ctx.command.clone(),
            exit_code: ctx.exit_code,
            line_number: ctx.line_number,
            function_name: ctx.function_name.clone(),
            process_id: std::process::id(),
        }
    }
}

/// One caller frame reported by the provisioning layer, outward from
/// the failure point.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub line: u32,
    pub function: String,
    pub file: String,
}

impl FromStr for CallFrame {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, String> {
        let mut parts = value.splitn(3, ':');
        let line = parts
            .next()
            .and_then(|raw| raw.parse::<u32>().ok())
            .ok_or_else(|| format!("Invalid frame `{value}`: expected LINE:FUNCTION:FILE"))?;
        let function = parts
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| format!("Invalid frame `{value}`: missing function name"))?
            .to_string();
        let file = parts.next().unwrap_or("?").to_string();
        Ok(Self {
            line,
            function,
            file,
        })
    }
}

/// Everything the provisioning layer knows about a failure when it
/// hands control to the error handler.
#[derive(Debug, Clone)]
pub struct FailureContext {
    pub command: String,
    pub exit_code: i32,
    pub line_number: u32,
    pub function_name: String,
    pub script_path: Option<PathBuf>,
    pub frames: Vec<CallFrame>,
    pub category: Option<CommandCategory>,
}

/// Produce an identifier distinct from all others on this host with
/// overwhelming probability: second-granularity timestamp, hostname,
/// and four bytes of process-local randomness.
pub fn new_error_id() -> String {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());
    format!("{stamp}_{host}_{:08x}", rand::random::<u32>())
}
