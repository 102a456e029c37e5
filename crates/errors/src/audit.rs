//! Audit tool error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum AuditError {
    #[error("failed to start audit tool {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("audit tool {program} timed out after {seconds} seconds")]
    Timeout { program: String, seconds: u64 },

    #[error("audit tool {program} exited with status {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("working directory not found: {path}")]
    WorkingDirMissing { path: String },

    #[error("audit output could not be parsed: {message}")]
    InvalidOutput { message: String },
}

impl UserFacingError for AuditError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SpawnFailed { .. } => {
                Some("Install the audit tool or set [audit].program in the configuration.")
            }
            Self::Timeout { .. } => Some("Increase [audit].timeout or retry when the system is idle."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SpawnFailed { .. } => "audit.spawn_failed",
            Self::Timeout { .. } => "audit.timeout",
            Self::ToolFailed { .. } => "audit.tool_failed",
            Self::WorkingDirMissing { .. } => "audit.working_dir_missing",
            Self::InvalidOutput { .. } => "audit.invalid_output",
        };
        Some(code)
    }
}
