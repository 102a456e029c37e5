//! Run orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum OpsError {
    /// The run cannot proceed at all (installed list unreadable, cache
    /// directory not writable, ...).
    #[error("{message}")]
    Structural { message: String },

    #[error("cannot read installed plugin list {path}: {message}")]
    InstalledListUnreadable { path: String, message: String },

    #[error("component not found: {component}")]
    MissingComponent { component: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("no audit results found; run `plaudit audit` first")]
    NoPreviousRun,

    #[error("worker task failed: {message}")]
    TaskFailed { message: String },
}

impl UserFacingError for OpsError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InstalledListUnreadable { .. } => {
                Some("Point --installed (or [paths].installed_plugins) at community-plugins.json.")
            }
            Self::MissingComponent { .. } => Some("This is a bug in how the run context was built."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Structural { .. } => "ops.structural",
            Self::InstalledListUnreadable { .. } => "ops.installed_list_unreadable",
            Self::MissingComponent { .. } => "ops.missing_component",
            Self::SerializationError { .. } => "ops.serialization",
            Self::NoPreviousRun => "ops.no_previous_run",
            Self::TaskFailed { .. } => "ops.task_failed",
        };
        Some(code)
    }
}
