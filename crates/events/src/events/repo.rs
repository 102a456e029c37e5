use serde::{Deserialize, Serialize};

/// Repository host lookup events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepoEvent {
    /// Metadata lookup started
    ResolveStarted { plugin: String, repo: String },

    /// Default branch and push watermark resolved
    Resolved {
        plugin: String,
        repo: String,
        branch: String,
        changed: bool,
    },

    /// Lookup failed; `fallback` is true when cached artifacts will be reused
    ResolveFailed {
        plugin: String,
        repo: String,
        failure: super::FailureContext,
        fallback: bool,
    },
}
