/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::notify
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Send a best-effort local mail summary of an error event to
    the administrator account.

  Security / Safety Notes:
    The summary carries the event id and command line only; the
    environment dump stays in the error log.

  Dependencies:
    tokio::process for the mail pipe.

  Operational Scope:
    Final stage of the error handler; a host without a mail
    facility is silently tolerated.

  Revision History:
    2025-11-22 COD  Authored administrator notification.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Notification is advisory, never load-bearing
    - Bounded delivery so a wedged MTA cannot stall the exit
============================================================*/

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::NotifyConfig;
use crate::error::{Result, VigilError};
use crate::event::ErrorEvent;
use crate::logger::Logger;
use crate::probe;

/// Notify the local administrator about an error event, if a mail
/// facility exists. Never fails the caller.
pub async fn notify(
    event: &ErrorEvent,
    error_log: &Path,
    config: &NotifyConfig,
    logger: &Logger,
    limit: Duration,
) {
    if !config.enabled {
        logger.debug("Administrator notification disabled by configuration");
        return;
    }
    if !probe::binary_on_path("mail") {
        logger.debug("No local mail facility present; skipping notification");
        return;
    }

    let subject = format!("Provisioning failure {}", event.id);
    let body = compose_summary(event, error_log);

    match send_mail(&subject, &config.recipient, &body, limit).await {
        Ok(()) => logger.info(format!("Failure notification sent to {}", config.recipient)),
        Err(err) => logger.debug(format!("Failure notification skipped: {err}")),
    }
}

/// Short plain-text summary pointing the administrator at the full
/// forensic trail.
pub fn compose_summary(event: &ErrorEvent, error_log: &Path) -> String {
    format!(
        "Unattended provisioning halted on an error.\n\n\
         Error ID:   {}\n\
         Command:    {}\n\
         Exit code:  {}\n\
         Location:   line {} in {}\n\
         Timestamp:  {}\n\n\
         Full diagnostics: {}\n",
        event.id,
        event.failing_command,
        event.exit_code,
        event.line_number,
        event.function_name,
        event.timestamp,
        error_log.display()
    )
}

async fn send_mail(subject: &str, recipient: &str, body: &str, limit: Duration) -> Result<()> {
    let mut child = Command::new("mail")
        .arg("-s")
        .arg(subject)
        .arg(recipient)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| VigilError::Runtime(format!("Failed to spawn mail: {err}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(body.as_bytes())
            .await
            .map_err(|err| VigilError::Runtime(format!("Failed to feed mail body: {err}")))?;
        drop(stdin);
    }

    match timeout(limit, child.wait()).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(VigilError::CommandFailure {
            command: "mail".into(),
            status: status.code().unwrap_or(-1),
            stderr: String::new(),
        }),
        Ok(Err(err)) => Err(VigilError::Runtime(format!("mail delivery failed: {err}"))),
        Err(_) => Err(VigilError::Runtime("mail delivery timed out".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FailureContext;
    use crate::logger::LogLevel;
    use std::path::PathBuf;

    fn sample_event() -> ErrorEvent {
        let ctx = FailureContext {
            command: "cp /a /b".to_string(),
            exit_code: 1,
            line_number: 42,
            function_name: "setup_dotfiles".to_string(),
            script_path: None,
            frames: Vec::new(),
            category: None,
        };
        ErrorEvent::from_context(&ctx)
    }

    #[test]
    fn summary_points_at_the_forensic_trail() {
        let event = sample_event();
        let summary = compose_summary(&event, &PathBuf::from("/var/log/syn-vigil/error.log"));

        assert!(summary.contains(&event.id));
        assert!(summary.contains("cp /a /b"));
        assert!(summary.contains("line 42 in setup_dotfiles"));
        assert!(summary.contains("/var/log/syn-vigil/error.log"));
    }

    #[tokio::test]
    async fn disabled_notification_is_a_no_op() {
        let logger = Logger::new(None, LogLevel::Error);
        let config = NotifyConfig {
            enabled: false,
            recipient: "root".to_string(),
        };
        notify(
            &sample_event(),
            &PathBuf::from("/tmp/error.log"),
            &config,
            &logger,
            Duration::from_secs(5),
        )
        .await;
    }
}
