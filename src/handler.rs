/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::handler
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Orchestrate the full diagnostic sequence for one trapped
    provisioning failure and yield the propagated exit code.

  Security / Safety Notes:
    The handler only appends to operator-owned logs and state
    files; it never re-executes the failing command.

  Dependencies:
    Every diagnostic module in the crate; serde_json for the
    persisted event record.

  Operational Scope:
    Invoked at most once per process lifetime, immediately
    before the driver terminates the run.

  Revision History:
    2025-11-23 COD  Authored error-handling orchestrator.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Strictly linear stage sequence, every stage mandatory
    - Stages are internally best-effort, never fatal
    - One deliberate exit point owned by the driver
============================================================*/

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use crate::config::VigilConfig;
use crate::event::{ErrorEvent, FailureContext};
use crate::guard;
use crate::logger::{self, LogLevel, Logger};
use crate::notify;
use crate::recovery::{self, CommandCategory};
use crate::rotate;
use crate::snapshot::{self, SnapshotLabel};
use crate::trace::StackContext;

/// Stages of the handler's linear state machine. `Armed` precedes the
/// first failure and `Terminated` is the driver's exit; everything in
/// between runs here, in order, unconditionally.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Triggered,
    Logging,
    Tracing,
    Snapshotting,
    Recovering,
    Guarding,
    Notifying,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Triggered => "triggered",
            Stage::Logging => "logging",
            Stage::Tracing => "tracing",
            Stage::Snapshotting => "snapshotting",
            Stage::Recovering => "recovering",
            Stage::Guarding => "guarding",
            Stage::Notifying => "notifying",
        }
    }
}

/// Run the full diagnostic sequence for one trapped failure and
/// return the exit code the process must terminate with.
pub async fn report(ctx: &FailureContext, config: &VigilConfig, logger: &Logger) -> i32 {
    let event = ErrorEvent::from_context(ctx);
    enter(Stage::Triggered, logger);

    let error_log = config.error_log();
    let state_dir = config.state_dir();
    let limit = config.probe_timeout();

    enter(Stage::Logging, logger);
    if let Err(err) = rotate::rotate_if_needed(&error_log, &config.rotation_policy()) {
        eprintln!("[Syn-Vigil-Core] Error log rotation failed: {err}");
    }
    let summary = format!(
        "Command `{}` failed with exit code {} at line {} in {} (error id {})",
        event.failing_command, event.exit_code, event.line_number, event.function_name, event.id
    );
    let record = logger::format_record(LogLevel::Error, &summary);
    eprintln!("{record}");
    logger.error(&summary);
    append_error_log(&error_log, &record);
    append_event_record(&state_dir, &event);

    enter(Stage::Tracing, logger);
    let context = StackContext::collect(ctx);
    append_error_log(&error_log, &context.render(&event, ctx));

    enter(Stage::Snapshotting, logger);
    let label = SnapshotLabel::Error(event.id.clone());
    match snapshot::capture(&label, &state_dir, &config.snapshot).await {
        Ok(path) => {
            append_error_log(&error_log, &format!("State snapshot: {}", path.display()));
        }
        Err(err) => logger.warn(format!("State snapshot capture failed: {err}")),
    }

    enter(Stage::Recovering, logger);
    let category = ctx
        .category
        .unwrap_or_else(|| CommandCategory::classify(&ctx.command));
    logger.debug(format!(
        "Failing command classified as `{}`",
        category.as_str()
    ));
    recovery::attempt(category, &ctx.command, logger, limit).await;

    enter(Stage::Guarding, logger);
    guard::check_and_escalate(
        &event.id,
        &config.guard,
        &config.snapshot,
        &state_dir,
        logger,
    )
    .await;

    enter(Stage::Notifying, logger);
    notify::notify(&event, &error_log, &config.notify, logger, limit).await;

    if event.exit_code != 0 {
        event.exit_code
    } else {
        1
    }
}

fn enter(stage: Stage, logger: &Logger) {
    logger.debug(format!("Error handler stage: {}", stage.as_str()));
}

/// Append one block to the error log. Infrastructure failures fall
/// back to stderr and never escalate.
fn append_error_log(path: &Path, text: &str) {
    let result = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", text.trim_end())?;
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!(
            "[Syn-Vigil-Core] Failed to append to error log {}: {err}",
            path.display()
        );
        eprintln!("{text}");
    }
}

/// Append the event's JSON record to the diagnostics directory.
fn append_event_record(state_dir: &Path, event: &ErrorEvent) {
    if let Err(err) = try_append_event_record(state_dir, event) {
        eprintln!("[Syn-Vigil-Core] Failed to persist event record: {err}");
    }
}

fn try_append_event_record(state_dir: &Path, event: &ErrorEvent) -> crate::error::Result<()> {
    std::fs::create_dir_all(state_dir)?;
    let line = serde_json::to_string(event).map_err(|err| {
        crate::error::VigilError::Serialization(format!("Failed to encode event record: {err}"))
    })?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join("events.jsonl"))?;
    writeln!(file, "{line}")?;
    Ok(())
}
