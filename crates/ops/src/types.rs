//! Run inputs and outputs

use chrono::{DateTime, Utc};
use plaudit_types::{AuditResults, AuditSummary, PluginAudit, PluginRecord};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Everything one audit run needs from its caller
#[derive(Debug, Clone)]
pub struct RunContext {
    /// JSON array of installed plugin ids
    pub installed_plugins: PathBuf,
    /// Credential for the repository host API
    pub credential: Option<String>,
    /// Bound on concurrent acquisitions
    pub jobs: usize,
    /// Checked between plugins in both passes
    pub cancel: CancellationToken,
}

impl RunContext {
    #[must_use]
    pub fn new(installed_plugins: PathBuf) -> Self {
        Self {
            installed_plugins,
            credential: None,
            jobs: 4,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential.filter(|c| !c.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub completed_at: DateTime<Utc>,
    /// Final status line
    pub message: String,
    pub summary: AuditSummary,
    pub plugins: Vec<PluginAudit>,
    /// The refreshed installed manifest
    pub records: Vec<PluginRecord>,
    /// Rendered audit log
    #[serde(skip)]
    pub log: String,
}

impl RunResult {
    /// Structured form persisted as `results.json`
    #[must_use]
    pub fn to_results(&self) -> AuditResults {
        AuditResults {
            completed_at: self.completed_at,
            summary: self.summary,
            plugins: self.plugins.clone(),
        }
    }
}
