/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::recovery
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Classify a failing provisioning command and run one bounded
    corrective probe appropriate to its category.

  Security / Safety Notes:
    Recovery probes are conservative: package cleanup, read-only
    consistency checks, and permission listings only.

  Dependencies:
    tokio::process via the probe layer.

  Operational Scope:
    Invoked once per trapped error; only known, well-understood
    failure shapes receive an action.

  Revision History:
    2025-11-22 COD  Authored category classifier and probes.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Closed category set, no guessing at arbitrary commands
    - Probe failures swallowed, never escalated
    - Explicit category hand-off from the provisioning layer
============================================================*/

use std::str::FromStr;
use std::time::Duration;

use crate::logger::Logger;
use crate::probe;

/// Closed classification of failing provisioning operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCategory {
    Package,
    Mount,
    FileOp,
    Unknown,
}

impl CommandCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandCategory::Package => "package",
            CommandCategory::Mount => "mount",
            CommandCategory::FileOp => "fileop",
            CommandCategory::Unknown => "unknown",
        }
    }

    /// Fallback classifier for commands whose category the provisioning
    /// layer did not pass explicitly. Matches on the leading tool name.
    pub fn classify(command: &str) -> Self {
        let Some(head) = command.split_whitespace().next() else {
            return CommandCategory::Unknown;
        };
        let head = head.rsplit('/').next().unwrap_or(head);
        match head {
            "pkg_add" | "pkg_delete" | "pkg_info" | "pkgin" | "pkg" | "pacman" | "apt"
            | "apt-get" | "dnf" | "yum" => CommandCategory::Package,
            "umount" => CommandCategory::Mount,
            name if name == "mount" || name.starts_with("mount_") => CommandCategory::Mount,
            "cp" | "mv" | "rm" | "install" | "mkdir" | "rmdir" | "ln" | "chmod" | "chown" => {
                CommandCategory::FileOp
            }
            _ => CommandCategory::Unknown,
        }
    }
}

impl FromStr for CommandCategory {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "package" => Ok(CommandCategory::Package),
            "mount" => Ok(CommandCategory::Mount),
            "fileop" | "file-op" | "file_op" => Ok(CommandCategory::FileOp),
            "unknown" => Ok(CommandCategory::Unknown),
            other => Err(format!("Unknown command category `{other}`")),
        }
    }
}

/// Run the corrective probe for the classified failure. Always best
/// effort: probe failures are logged at DEBUG and swallowed.
pub async fn attempt(
    category: CommandCategory,
    command: &str,
    logger: &Logger,
    limit: Duration,
) {
    match category {
        CommandCategory::Package => {
            let Some(package) = package_argument(command) else {
                logger.debug("No package argument found; skipping cleanup probe");
                return;
            };
            logger.info(format!(
                "Attempting cleanup of partially installed package `{package}`"
            ));
            run_probe_logged("pkg_delete", &[package.as_str()], logger, limit).await;
        }
        CommandCategory::Mount => {
            let Some(device) = mount_target(command) else {
                logger.debug("No mount target found; skipping consistency check");
                return;
            };
            logger.info(format!("Running read-only consistency check on `{device}`"));
            run_probe_logged("fsck", &["-n", device.as_str()], logger, limit).await;
        }
        CommandCategory::FileOp => {
            let Some(target) = file_target(command) else {
                logger.debug("No file target found; skipping permission listing");
                return;
            };
            logger.info(format!("Listing permissions for `{target}`"));
            run_probe_logged("ls", &["-ld", target.as_str()], logger, limit).await;
        }
        CommandCategory::Unknown => {
            logger.debug(format!("No recovery action for command `{command}`"));
        }
    }
}

async fn run_probe_logged(command: &str, args: &[&str], logger: &Logger, limit: Duration) {
    match probe::run(command, args, limit).await {
        Ok(output) if output.success() => {
            let detail = output.stdout.trim();
            if detail.is_empty() {
                logger.info(format!("Recovery probe `{command}` completed"));
            } else {
                logger.info(format!("Recovery probe `{command}`: {detail}"));
            }
        }
        Ok(output) => {
            logger.debug(format!(
                "Recovery probe `{command}` exited with status {}: {}",
                output.status, output.stderr
            ));
        }
        Err(err) => {
            logger.debug(format!("Recovery probe `{command}` unavailable: {err}"));
        }
    }
}

/// First non-flag argument after the tool name.
fn package_argument(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .skip(1)
        .find(|token| !token.starts_with('-'))
        .map(|token| token.to_string())
}

/// First absolute path after the tool name; for `mount src dst` this
/// is the device being mounted.
fn mount_target(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .skip(1)
        .find(|token| token.starts_with('/'))
        .map(|token| token.to_string())
}

/// Last non-flag argument; for copy/move operations this is the
/// destination the operator cares about.
fn file_target(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .skip(1)
        .filter(|token| !token.starts_with('-'))
        .last()
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;

    #[test]
    fn package_manager_commands_classify_as_package() {
        assert_eq!(
            CommandCategory::classify("pkg_add curl"),
            CommandCategory::Package
        );
        assert_eq!(
            CommandCategory::classify("/usr/sbin/pkg_add -v curl"),
            CommandCategory::Package
        );
        assert_eq!(
            CommandCategory::classify("pkgin -y install tmux"),
            CommandCategory::Package
        );
    }

    #[test]
    fn mount_commands_classify_as_mount() {
        assert_eq!(
            CommandCategory::classify("mount /dev/x /mnt"),
            CommandCategory::Mount
        );
        assert_eq!(
            CommandCategory::classify("mount_ffs /dev/wd0a /usr"),
            CommandCategory::Mount
        );
        assert_eq!(CommandCategory::classify("umount /mnt"), CommandCategory::Mount);
    }

    #[test]
    fn file_manipulation_commands_classify_as_fileop() {
        assert_eq!(CommandCategory::classify("cp /a /b"), CommandCategory::FileOp);
        assert_eq!(
            CommandCategory::classify("rm -rf /tmp/stale"),
            CommandCategory::FileOp
        );
        assert_eq!(
            CommandCategory::classify("chown root:wheel /etc/rc.conf"),
            CommandCategory::FileOp
        );
    }

    #[test]
    fn unmatched_commands_stay_unknown() {
        assert_eq!(CommandCategory::classify("echo hi"), CommandCategory::Unknown);
        assert_eq!(CommandCategory::classify(""), CommandCategory::Unknown);
    }

    #[test]
    fn explicit_categories_parse_from_the_cli() {
        assert_eq!(
            "package".parse::<CommandCategory>().unwrap(),
            CommandCategory::Package
        );
        assert_eq!(
            "file-op".parse::<CommandCategory>().unwrap(),
            CommandCategory::FileOp
        );
        assert!("reboot".parse::<CommandCategory>().is_err());
    }

    #[test]
    fn target_extraction_follows_the_operator_view() {
        assert_eq!(package_argument("pkg_add -v curl"), Some("curl".to_string()));
        assert_eq!(
            mount_target("mount /dev/x /mnt"),
            Some("/dev/x".to_string())
        );
        assert_eq!(file_target("cp /a /b"), Some("/b".to_string()));
        assert_eq!(file_target("rm -rf"), None);
    }

    #[tokio::test]
    async fn unknown_category_takes_no_action() {
        let logger = Logger::new(None, LogLevel::Error);
        attempt(
            CommandCategory::Unknown,
            "echo hi",
            &logger,
            Duration::from_secs(5),
        )
        .await;
    }

    #[tokio::test]
    async fn failing_probes_are_swallowed() {
        let logger = Logger::new(None, LogLevel::Error);
        // `ls -ld` on a missing path exits nonzero; the attempt must not.
        attempt(
            CommandCategory::FileOp,
            "cp /a /no/such/destination",
            &logger,
            Duration::from_secs(5),
        )
        .await;
        // `pkg_delete` is typically absent on the test host; also fine.
        attempt(
            CommandCategory::Package,
            "pkg_add curl",
            &logger,
            Duration::from_secs(5),
        )
        .await;
    }
}
