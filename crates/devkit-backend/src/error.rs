use devkit_exec::{ChainError, FailureKind};
use thiserror::Error;

/// Failure of one logical operation, as reported to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No strategy could launch the tool.
    #[error("{message}")]
    ToolNotFound { tool: &'static str, message: String },

    /// The tool ran but reported a problem.
    #[error("{message}")]
    ToolReported { tool: &'static str, message: String },

    /// Everything ran fine but there was nothing to list.
    #[error("No {what} found")]
    NothingFound { what: &'static str },

    #[error("{message} (run devkit as administrator to change this setting)")]
    PermissionDenied { tool: &'static str, message: String },

    #[error("{message}")]
    Timeout { tool: &'static str, message: String },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl ToolError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Stable identifier used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolNotFound { .. } => "tool-not-found",
            Self::ToolReported { .. } => "tool-reported",
            Self::NothingFound { .. } => "nothing-found",
            Self::PermissionDenied { .. } => "permission-denied",
            Self::Timeout { .. } => "timeout",
            Self::InvalidInput { .. } => "invalid-input",
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

impl From<ChainError> for ToolError {
    fn from(error: ChainError) -> Self {
        let tool = error.tool();
        let message = error.to_string();
        match error {
            ChainError::ToolReported { stderr, .. } => Self::ToolReported {
                tool,
                message: stderr,
            },
            ChainError::PermissionDenied { message, .. } => {
                Self::PermissionDenied { tool, message }
            }
            ChainError::Exhausted { last, .. } => match last.kind {
                FailureKind::NotFound => Self::ToolNotFound { tool, message },
                FailureKind::NonZeroExit => Self::ToolReported { tool, message },
                FailureKind::Timeout => Self::Timeout { tool, message },
                FailureKind::PermissionDenied => Self::PermissionDenied {
                    tool,
                    message: last.message,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devkit_exec::ExecutionFailure;

    fn exhausted(kind: FailureKind, message: &str) -> ChainError {
        ChainError::Exhausted {
            tool: "nvm",
            attempts: 3,
            hint: "confirm nvm is installed and on PATH".to_string(),
            last: ExecutionFailure::new(kind, message),
        }
    }

    #[test]
    fn exhausted_not_found_keeps_message_and_hint() {
        let error = ToolError::from(exhausted(FailureKind::NotFound, "`nvm` was not found"));

        assert_eq!(error.kind(), "tool-not-found");
        assert_eq!(
            error.to_string(),
            "`nvm` was not found (confirm nvm is installed and on PATH)"
        );
    }

    #[test]
    fn exhausted_non_zero_exit_is_reported() {
        let error = ToolError::from(exhausted(FailureKind::NonZeroExit, "exited with code 1"));
        assert_eq!(error.kind(), "tool-reported");
    }

    #[test]
    fn exhausted_timeout_is_timeout() {
        let error = ToolError::from(exhausted(FailureKind::Timeout, "too slow"));
        assert!(matches!(error, ToolError::Timeout { tool: "nvm", .. }));
    }

    #[test]
    fn reported_stderr_is_verbatim() {
        let error = ToolError::from(ChainError::ToolReported {
            tool: "nrm",
            stderr: "Not find registry: foo".to_string(),
        });

        assert_eq!(error.to_string(), "Not find registry: foo");
    }

    #[test]
    fn permission_denied_mentions_administrator() {
        let error = ToolError::from(ChainError::PermissionDenied {
            tool: "powershell",
            message: "Requested registry access is not allowed.".to_string(),
        });

        assert_eq!(error.kind(), "permission-denied");
        assert!(error.to_string().contains("administrator"));
    }

    #[test]
    fn invalid_input_names_the_field() {
        let error = ToolError::invalid_input("version", "must look like 18 or v18.17.0");
        assert_eq!(
            error.to_string(),
            "Invalid version: must look like 18 or v18.17.0"
        );
    }
}
