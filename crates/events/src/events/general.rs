use serde::{Deserialize, Serialize};

/// Run-level notices that are not tied to one pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// The run degraded but carries on, e.g. a discarded cache document or
    /// a reused manifest after a failed freshness check
    Warning {
        message: String,
        context: Option<String>,
    },

    /// Diagnostic line, only shown with `--debug`
    Debug { message: String },

    /// A top-level command (`audit`, `report`, `log`) began
    OperationStarted { operation: String },

    /// A top-level command finished
    OperationCompleted { operation: String, success: bool },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: None,
        }
    }

    /// Warning with the underlying cause kept apart from the headline
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::Debug {
            message: message.into(),
        }
    }
}
