use plaudit_types::{AuditSummary, RunPhase};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run progress events. This is the progress sink contract: a percentage,
/// a status line and, once known, the summary counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// A phase transition or per-plugin step; `percent` never decreases within a run
    Updated {
        phase: RunPhase,
        percent: u8,
        message: String,
        summary: Option<AuditSummary>,
    },

    /// The run reached `Done`
    Completed {
        message: String,
        summary: AuditSummary,
        duration: Duration,
    },

    /// The run reached `Failed` or was cancelled
    Failed {
        message: String,
        failure: super::FailureContext,
    },
}

impl ProgressEvent {
    /// Final message of the run, if this event is terminal
    #[must_use]
    pub fn final_message(&self) -> Option<&str> {
        match self {
            Self::Completed { message, .. } | Self::Failed { message, .. } => Some(message),
            Self::Updated { .. } => None,
        }
    }
}
