/*============================================================
  Synavera Project: Syn-Vigil
  Module: synvigil_core::trace
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Assemble the stack context for a trapped failure: caller
    frames, the full environment, and a source excerpt around
    the failing line.

  Security / Safety Notes:
    The environment dump is written to the operator-owned error
    log only; it never leaves the host.

  Dependencies:
    None beyond std.

  Operational Scope:
    Produced once per error event and appended to the error log
    under that event's id.

  Revision History:
    2025-11-20 COD  Authored stack-context assembly.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering for reproducible diffs
    - Best-effort sub-steps that never abort the trace
    - Failing line marked distinctly for fast triage
============================================================*/

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::event::{CallFrame, ErrorEvent, FailureContext};

const EXCERPT_RADIUS: u32 = 5;

/// One line of the source excerpt around the failure point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptLine {
    pub number: u32,
    pub text: String,
    pub failing: bool,
}

/// The full stack context captured for one error event.
#[derive(Debug)]
pub struct StackContext {
    pub frames: Vec<CallFrame>,
    pub environment: BTreeMap<String, String>,
    pub excerpt: Vec<ExcerptLine>,
}

impl StackContext {
    /// Collect frames, environment, and source excerpt. Every sub-step
    /// is best-effort; whatever cannot be gathered is simply absent.
    pub fn collect(ctx: &FailureContext) -> Self {
        let environment = std::env::vars().collect();
        let excerpt = ctx
            .script_path
            .as_deref()
            .map(|path| excerpt_window(path, ctx.line_number))
            .unwrap_or_default();

        Self {
            frames: ctx.frames.clone(),
            environment,
            excerpt,
        }
    }

    /// Render the text block appended to the error log under the
    /// event's id.
    pub fn render(&self, event: &ErrorEvent, ctx: &FailureContext) -> String {
        let cwd = std::env::current_dir()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| "?".to_string());
        let user = std::env::var("USER").unwrap_or_else(|_| "?".to_string());
        let script = ctx
            .script_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unavailable>".to_string());

        let mut block = String::new();
        let _ = writeln!(block, "Stack Trace (Error ID: {})", event.id);
        let _ = writeln!(block, "  Process ID: {}", event.process_id);
        let _ = writeln!(block, "  Failing command: {}", event.failing_command);
        let _ = writeln!(block, "  Exit code: {}", event.exit_code);
        let _ = writeln!(block, "  Line number: {}", event.line_number);
        let _ = writeln!(block, "  Script: {script}");
        let _ = writeln!(block, "  Working directory: {cwd}");
        let _ = writeln!(block, "  User: {user}");
        let _ = writeln!(block, "  Timestamp: {}", event.timestamp);

        let _ = writeln!(block, "  Call frames:");
        if self.frames.is_empty() {
            let _ = writeln!(block, "    (no caller frames reported)");
        }
        for (depth, frame) in self.frames.iter().enumerate() {
            let _ = writeln!(
                block,
                "    #{depth} line {} in {} ({})",
                frame.line, frame.function, frame.file
            );
        }

        let _ = writeln!(block, "  Environment:");
        for (name, value) in &self.environment {
            let _ = writeln!(block, "    {name}={value}");
        }

        if !self.excerpt.is_empty() {
            let _ = writeln!(block, "  Source excerpt:");
            for line in &self.excerpt {
                let marker = if line.failing { ">>" } else { "  " };
                let _ = writeln!(block, "  {marker} {:>5} | {}", line.number, line.text);
            }
        }

        block
    }
}

/// Extract a window of lines around `failing_line`, clamped to line 1
/// at the lower bound, with the failing line marked. An unreadable
/// file yields an empty excerpt.
pub fn excerpt_window(path: &Path, failing_line: u32) -> Vec<ExcerptLine> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let marked = failing_line.max(1);
    let start = marked.saturating_sub(EXCERPT_RADIUS).max(1);
    let end = marked.saturating_add(EXCERPT_RADIUS);

    let mut window = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let number = index as u32 + 1;
        if number < start {
            continue;
        }
        if number > end {
            break;
        }
        window.push(ExcerptLine {
            number,
            text: line.to_string(),
            failing: number == marked,
        });
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn numbered_script(lines: u32) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for number in 1..=lines {
            writeln!(file, "step {number}").unwrap();
        }
        file
    }

    fn context_for(script: Option<&Path>, line: u32) -> FailureContext {
        FailureContext {
            command: "cp /a /b".to_string(),
            exit_code: 1,
            line_number: line,
            function_name: "setup_dotfiles".to_string(),
            script_path: script.map(Path::to_path_buf),
            frames: vec![CallFrame {
                line,
                function: "setup_dotfiles".to_string(),
                file: "./provision.sh".to_string(),
            }],
            category: None,
        }
    }

    #[test]
    fn excerpt_marks_the_failing_line() {
        let script = numbered_script(20);
        let window = excerpt_window(script.path(), 10);

        assert_eq!(window.first().unwrap().number, 5);
        assert_eq!(window.last().unwrap().number, 15);
        let marked: Vec<u32> = window
            .iter()
            .filter(|line| line.failing)
            .map(|line| line.number)
            .collect();
        assert_eq!(marked, vec![10]);
    }

    #[test]
    fn excerpt_clamps_to_the_first_line() {
        let script = numbered_script(20);

        let near_top = excerpt_window(script.path(), 2);
        assert_eq!(near_top.first().unwrap().number, 1);
        assert!(near_top.iter().any(|line| line.failing && line.number == 2));

        let below_range = excerpt_window(script.path(), 0);
        assert!(below_range.iter().any(|line| line.failing && line.number == 1));
    }

    #[test]
    fn excerpt_stops_at_the_end_of_file() {
        let script = numbered_script(8);
        let window = excerpt_window(script.path(), 7);
        assert_eq!(window.last().unwrap().number, 8);
    }

    #[test]
    fn unreadable_script_yields_an_empty_excerpt() {
        let window = excerpt_window(Path::new("/no/such/provision.sh"), 42);
        assert!(window.is_empty());
    }

    #[test]
    fn render_carries_frames_and_sorted_environment() {
        let script = numbered_script(20);
        let ctx = context_for(Some(script.path()), 10);
        let event = ErrorEvent::from_context(&ctx);

        let mut context = StackContext::collect(&ctx);
        context.environment.clear();
        context
            .environment
            .insert("ZULU".to_string(), "last".to_string());
        context
            .environment
            .insert("ALPHA".to_string(), "first".to_string());

        let block = context.render(&event, &ctx);
        assert!(block.starts_with(&format!("Stack Trace (Error ID: {})", event.id)));
        assert!(block.contains("#0 line 10 in setup_dotfiles (./provision.sh)"));
        assert!(block.find("ALPHA=first").unwrap() < block.find("ZULU=last").unwrap());
        assert!(block.contains(">>    10 | step 10"));
    }

    #[test]
    fn render_survives_a_missing_script() {
        let ctx = context_for(None, 42);
        let event = ErrorEvent::from_context(&ctx);
        let context = StackContext::collect(&ctx);
        let block = context.render(&event, &ctx);
        assert!(block.contains("Script: <unavailable>"));
        assert!(!block.contains("Source excerpt:"));
    }
}
