//! Persisted report definitions

use crate::{AuditSummary, PluginAudit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured result of one completed run, persisted as `results.json`.
///
/// The human-readable `audit.log` is a view over `plugins`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResults {
    pub completed_at: DateTime<Utc>,
    pub summary: AuditSummary,
    pub plugins: Vec<PluginAudit>,
}

impl AuditResults {
    /// Build a report whose summary is derived from `plugins`
    #[must_use]
    pub fn new(completed_at: DateTime<Utc>, plugins: Vec<PluginAudit>) -> Self {
        let summary = AuditSummary::from_outcomes(plugins.iter().map(|p| &p.outcome));
        Self {
            completed_at,
            summary,
            plugins,
        }
    }
}
