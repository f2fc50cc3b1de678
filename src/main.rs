/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Vigil Core. Receives progress records
    and trapped failures from the provisioning Bash layer,
    drives the diagnostic sequence, and terminates with the
    propagated exit code.

  Security / Safety Notes:
    Operates within user privileges. Executes read-only system
    inspection tools and conservative recovery probes only.

  Dependencies:
    clap for CLI parsing, tokio for bounded probe execution.

  Operational Scope:
    Invoked by the Syn-Vigil Bash layer via its ERR trap and
    progress hooks, or by operators for standalone snapshots.

  Revision History:
    2025-11-23 COD  Authored Syn-Vigil Core runtime.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

mod config;
mod error;
mod event;
mod guard;
mod handler;
mod logger;
mod notify;
mod probe;
mod recovery;
mod rotate;
mod snapshot;
mod trace;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use config::VigilConfig;
use error::Result;
use event::{new_error_id, CallFrame, FailureContext};
use logger::{LogLevel, Logger};
use recovery::CommandCategory;
use snapshot::SnapshotLabel;

/// Command-line arguments for Syn-Vigil-Core.
#[derive(Debug, Parser)]
#[command(
    name = "Syn-Vigil-Core",
    version,
    author = "Synavera Systems",
    about = "Diagnostic and recovery core for Synavera provisioning runs"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Explicit activity log path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Lower the minimum level to DEBUG and echo colored records.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Append a leveled progress record to the activity log.
    Log {
        /// Record severity.
        #[arg(long, value_name = "LEVEL", default_value = "INFO")]
        level: LogLevel,
        /// Message text.
        #[arg(value_name = "MESSAGE", required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Report a trapped failure and terminate with its exit code.
    Report {
        /// The failing command, verbatim.
        #[arg(long, value_name = "CMD")]
        command: String,
        /// Exit code of the failing command.
        #[arg(long, value_name = "CODE", default_value_t = 1)]
        exit_code: i32,
        /// Line number at the failure point.
        #[arg(long, value_name = "LINE")]
        line: u32,
        /// Enclosing function at the failure point.
        #[arg(long, value_name = "NAME")]
        function: String,
        /// Path to the failing provisioning script.
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,
        /// Caller frame as LINE:FUNCTION:FILE, repeated outward from
        /// the failure point.
        #[arg(long = "frame", value_name = "LINE:FUNCTION:FILE", action = ArgAction::Append)]
        frames: Vec<CallFrame>,
        /// Category of the failing operation, when the provisioning
        /// layer knows it.
        #[arg(long, value_name = "CATEGORY")]
        category: Option<CommandCategory>,
    },
    /// Capture a standalone state snapshot for operator inspection.
    Snapshot {
        /// Label for the snapshot artifact; defaults to a fresh id.
        #[arg(long, value_name = "NAME")]
        label: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Syn-Vigil-Core] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = VigilConfig::load_from_optional_path(cli.config.as_deref())?;
    let min_level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.min_level()?
    };
    let log_path = cli.log.clone().unwrap_or_else(|| config.log_file());
    let logger = Logger::new(Some(log_path), min_level);

    match cli.command {
        Command::Log { level, message } => {
            // Logging is fail-safe: the trap above us must never see a
            // failing exit from a progress record.
            logger.log(level, message.join(" "));
            Ok(ExitCode::SUCCESS)
        }
        Command::Report {
            command,
            exit_code,
            line,
            function,
            script,
            frames,
            category,
        } => {
            let ctx = FailureContext {
                command,
                exit_code,
                line_number: line,
                function_name: function,
                script_path: script,
                frames,
                category,
            };
            let code = handler::report(&ctx, &config, &logger).await;
            if let Err(err) = logger.finalize() {
                eprintln!("[Syn-Vigil-Core] Failed to seal activity log: {err}");
            }
            Ok(ExitCode::from(code.clamp(1, 255) as u8))
        }
        Command::Snapshot { label } => {
            let label = SnapshotLabel::Error(label.unwrap_or_else(new_error_id));
            let path = snapshot::capture(&label, &config.state_dir(), &config.snapshot).await?;
            logger.info(format!("State snapshot written to {}", path.display()));
            println!("→ State snapshot written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
