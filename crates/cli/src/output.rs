// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use tidgit_common::protocol::message::{ErrorKind, WireError};
use tidgit_sync::worker::WorkerError;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    print_stderr(format, "error", ANSI_RED, code, message);
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    print_stderr(format, "warning", ANSI_YELLOW, code, message);
}

fn print_stderr(format: OutputFormat, label: &str, color: &str, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(label, message, io::stderr().is_terminal(), color);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let mut obj = serde_json::Map::new();
            obj.insert(label.to_string(), serde_json::json!({ "code": code, "message": message }));
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

/// Print a failure reported by the git worker.
pub fn print_wire_error(format: OutputFormat, error: &WireError) {
    let (code, message) = actionable_wire_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    for cause in error.chain() {
        if let Some(wire) = cause.downcast_ref::<WireError>() {
            return actionable_wire_error(wire);
        }
        if let Some(worker) = cause.downcast_ref::<WorkerError>() {
            if let WorkerError::Sync(sync) = worker {
                return actionable_wire_error(&sync.to_wire());
            }
            return (
                "WORKER_UNAVAILABLE",
                format!("{worker}. Check that git is installed and on PATH: git --version"),
            );
        }
    }
    ("ERROR", format!("{error:#}"))
}

fn actionable_wire_error(error: &WireError) -> (&'static str, String) {
    let message = error.message.as_str();
    match error.kind {
        ErrorKind::Configuration if message.contains("`access_token`") => (
            "TOKEN_MISSING",
            "The remote needs an access token. Set TIDGIT_TOKEN and retry.".to_string(),
        ),
        ErrorKind::Configuration if message.contains("not a git repository") => {
            ("NOT_INITIALIZED", format!("{message}. Run: tidgit init <folder>"))
        }
        ErrorKind::Configuration if message.contains("no remote") => {
            ("NO_REMOTE", format!("{message}. Run: tidgit sync --remote-url <url>"))
        }
        ErrorKind::Configuration => ("CONFIGURATION", message.to_string()),
        ErrorKind::Network if message.contains("offline") => {
            ("OFFLINE", "The host is offline; nothing was synchronized.".to_string())
        }
        ErrorKind::Network if message.contains(" 401") || message.contains(" 403") => (
            "TOKEN_REJECTED",
            format!("{message}. The access token expired or is wrong; update TIDGIT_TOKEN."),
        ),
        ErrorKind::Network => ("NETWORK", message.to_string()),
        ErrorKind::Conflict => (
            "REBASE_CONFLICT",
            format!("{message}. Resolve the conflict in a Git GUI, then run: tidgit sync"),
        ),
        ErrorKind::Contention => (
            "REPOSITORY_BUSY",
            format!("{message}. Wait for the other git process to finish and retry."),
        ),
        ErrorKind::SpecialState => ("SPECIAL_STATE", message.to_string()),
        ErrorKind::Merge => ("MERGE_FAILED", message.to_string()),
        ErrorKind::AlgorithmWrong => ("SYNC_ALGORITHM", message.to_string()),
        ErrorKind::Internal => ("INTERNAL", message.to_string()),
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
        }
        let info = Info { name: "notes".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &info, |i| format!("Wiki: {}", i.name))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Wiki: notes\n");
    }

    #[test]
    fn write_output_json_format() {
        #[derive(Serialize)]
        struct Info {
            name: String,
            changed: u32,
        }
        let info = Info { name: "notes".into(), changed: 3 };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &info, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["name"], "notes");
        assert_eq!(parsed["changed"], 3);
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true, ANSI_RED);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_warning_without_tty_is_plain() {
        let line = render_human_stderr_line("warning", "careful", false, ANSI_YELLOW);
        assert_eq!(line, "warning: careful");
    }

    #[test]
    fn missing_token_points_at_env_var() {
        let error = WireError::new(
            ErrorKind::Configuration,
            "required parameter `access_token` is missing",
        );
        let (code, message) = actionable_wire_error(&error);
        assert_eq!(code, "TOKEN_MISSING");
        assert!(message.contains("TIDGIT_TOKEN"));
    }

    #[test]
    fn not_initialized_suggests_init() {
        let error = WireError::new(ErrorKind::Configuration, "/w is not a git repository");
        let (code, message) = actionable_wire_error(&error);
        assert_eq!(code, "NOT_INITIALIZED");
        assert!(message.contains("tidgit init"));
    }

    #[test]
    fn conflict_suggests_resolving_then_syncing() {
        let error = WireError::new(ErrorKind::Conflict, "rebase stopped on conflicts in a.tid");
        let (code, message) = actionable_wire_error(&error);
        assert_eq!(code, "REBASE_CONFLICT");
        assert!(message.starts_with("rebase stopped on conflicts in a.tid"));
        assert!(message.contains("tidgit sync"));
    }

    #[test]
    fn rejected_token_is_distinguished_from_other_network_errors() {
        let rejected = WireError::new(
            ErrorKind::Network,
            "push failed: The requested URL returned error: 403",
        );
        assert_eq!(actionable_wire_error(&rejected).0, "TOKEN_REJECTED");

        let reset = WireError::new(ErrorKind::Network, "fetch failed: connection reset");
        assert_eq!(actionable_wire_error(&reset).0, "NETWORK");
    }

    #[test]
    fn worker_startup_failure_mentions_git() {
        let err = anyhow::Error::new(WorkerError::StartupTimeout(Duration::from_secs(60)));
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "WORKER_UNAVAILABLE");
        assert!(message.contains("git --version"));
    }

    #[test]
    fn wire_error_in_chain_is_mapped() {
        let err = anyhow::Error::new(WireError::new(ErrorKind::Contention, "index.lock exists"))
            .context("sync failed");
        assert_eq!(actionable_error(&err).0, "REPOSITORY_BUSY");
    }

    #[test]
    fn unknown_error_keeps_full_message() {
        let err = anyhow::anyhow!("disk full").context("writing tiddler");
        assert_eq!(actionable_error(&err), ("ERROR", "writing tiddler: disk full".to_string()));
    }
}
