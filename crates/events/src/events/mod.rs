use serde::{Deserialize, Serialize};

use crate::EventSource;
use plaudit_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod audit;
pub mod fetch;
pub mod general;
pub mod progress;
pub mod repo;

pub use audit::*;
pub use fetch::*;
pub use general::*;
pub use progress::*;
pub use repo::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Run-level warnings, diagnostics and command boundaries
    General(GeneralEvent),

    /// Run progress (the progress sink)
    Progress(ProgressEvent),

    /// Conditional fetches against the raw file host and registry
    Fetch(FetchEvent),

    /// Repository host lookups
    Repo(RepoEvent),

    /// Audit tool invocations and results
    Audit(AuditEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Progress(_) => EventSource::PROGRESS,
            Self::Fetch(_) => EventSource::FETCH,
            Self::Repo(_) => EventSource::REPO,
            Self::Audit(_) => EventSource::AUDIT,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::Progress(ProgressEvent::Failed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Fetch(FetchEvent::Failed { .. })
            | Self::Repo(RepoEvent::ResolveFailed { .. })
            | Self::Audit(AuditEvent::LockfileSynthesisFailed { .. }) => Level::WARN,

            // Debug-level events (probes, cache decisions, internal state)
            Self::General(GeneralEvent::Debug { .. })
            | Self::Fetch(FetchEvent::Probed { .. } | FetchEvent::CacheHit { .. })
            | Self::Repo(RepoEvent::ResolveStarted { .. })
            | Self::Audit(AuditEvent::PluginStarted { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "plaudit::events::general",
            Self::Progress(_) => "plaudit::events::progress",
            Self::Fetch(_) => "plaudit::events::fetch",
            Self::Repo(_) => "plaudit::events::repo",
            Self::Audit(_) => "plaudit::events::audit",
        }
    }
}
