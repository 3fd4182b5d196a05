use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::spec::CommandSpec;

/// Longest stderr excerpt folded into a failure message; the full text stays
/// in [`ExecutionFailure::raw`].
const STDERR_EXCERPT_CHARS: usize = 400;

/// Exit code POSIX shells use for "command not found".
const SH_NOT_FOUND: i32 = 127;
/// Exit code `cmd.exe` uses for "is not recognized as an internal or external
/// command".
const CMD_NOT_FOUND: i32 = 9009;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    NonZeroExit,
    Timeout,
    PermissionDenied,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::NonZeroExit => write!(f, "non-zero exit"),
            Self::Timeout => write!(f, "timeout"),
            Self::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

/// Why a single attempt did not produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    pub message: String,
    pub raw: Option<String>,
}

impl ExecutionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw: None,
        }
    }

    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub(crate) fn from_spawn(spec: &CommandSpec, error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::new(
                FailureKind::NotFound,
                format!("`{}` was not found", spec.program()),
            ),
            std::io::ErrorKind::PermissionDenied => Self::new(
                FailureKind::PermissionDenied,
                format!("not allowed to run `{}`: {error}", spec.program()),
            ),
            _ => Self::new(
                FailureKind::NonZeroExit,
                format!("failed to start `{spec}`: {error}"),
            ),
        }
    }

    pub(crate) fn timeout(spec: &CommandSpec, timeout: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("`{spec}` did not finish within {}s", timeout.as_secs()),
        )
    }

    /// Classify a finished process that exited unsuccessfully.
    pub(crate) fn from_exit(spec: &CommandSpec, code: Option<i32>, stderr: &str) -> Self {
        let excerpt = excerpt(stderr);
        let status = code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));

        let missing = matches!(code, Some(SH_NOT_FOUND | CMD_NOT_FOUND))
            || (spec.is_interpreted() && looks_like_command_not_found(stderr));
        let kind = if (spec.uses_shell() || spec.is_interpreted()) && missing {
            FailureKind::NotFound
        } else if looks_like_permission_denied(stderr) {
            FailureKind::PermissionDenied
        } else {
            FailureKind::NonZeroExit
        };

        let message = match kind {
            FailureKind::NotFound if spec.uses_shell() => {
                format!("`{}` was not found by the shell", spec.program())
            }
            FailureKind::NotFound => format!("`{spec}` could not find its command: {excerpt}"),
            _ if excerpt.is_empty() => format!("`{spec}` exited with {status}"),
            _ => format!("`{spec}` exited with {status}: {excerpt}"),
        };

        Self::new(kind, message).with_raw(stderr)
    }
}

/// How a strategy chain ended without a usable result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Every strategy failed; `last` is the failure of the final attempt.
    #[error("{last} ({hint})")]
    Exhausted {
        tool: &'static str,
        attempts: usize,
        hint: String,
        last: ExecutionFailure,
    },

    /// The tool ran and exited cleanly but wrote to stderr.
    #[error("{tool} reported an error: {stderr}")]
    ToolReported { tool: &'static str, stderr: String },

    #[error("{tool} was denied permission: {message}")]
    PermissionDenied { tool: &'static str, message: String },
}

impl ChainError {
    #[must_use]
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Exhausted { tool, .. }
            | Self::ToolReported { tool, .. }
            | Self::PermissionDenied { tool, .. } => tool,
        }
    }
}

#[must_use]
pub(crate) fn looks_like_permission_denied(text: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "access is denied",
        "access to the path",
        "registry access is not allowed",
        "unauthorizedaccess",
        "permission denied",
    ];
    let lower = text.to_lowercase();
    MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Shell and PowerShell wording for an unknown command name.
fn looks_like_command_not_found(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("command not found") || lower.contains("is not recognized as")
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.chars().count() <= STDERR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(STDERR_EXCERPT_CHARS).collect();
    format!("{cut}…")
}
