use plaudit_types::{AuditSummary, OutcomeCategory, Severity};
use serde::{Deserialize, Serialize};

/// Audit tool and classification events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuditEvent {
    /// Audit pass started
    RunStarted { plugin_count: usize },

    /// Audit tool invoked for one plugin
    PluginStarted { plugin: String },

    /// One plugin classified
    PluginCompleted {
        plugin: String,
        category: OutcomeCategory,
        severity: Option<Severity>,
    },

    /// A lockfile was generated locally from the manifest
    LockfileSynthesized { plugin: String },

    /// Lockfile generation failed; the audit proceeds without one
    LockfileSynthesisFailed {
        plugin: String,
        failure: super::FailureContext,
    },

    /// Aggregation finished
    RunCompleted {
        plugins_audited: usize,
        summary: AuditSummary,
    },
}
