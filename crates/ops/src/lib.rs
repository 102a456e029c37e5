#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! High-level operations orchestration for plaudit
//!
//! This crate serves as the orchestration layer between the CLI and the
//! specialized crates: it runs the audit state machine and answers
//! queries about the last persisted run.

mod context;
mod orchestrator;
mod report;
mod types;

pub use context::{OpsContextBuilder, OpsCtx};
pub use orchestrator::{run_audit, Orchestrator};
pub use report::{exceeds_threshold, load_results, read_log, select_plugins};
pub use types::{RunContext, RunResult};

use plaudit_errors::Error;
use plaudit_types::{AuditResults, PluginAudit};

/// Operation result that can be serialized for CLI output
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationResult {
    /// A finished audit run
    AuditRun(RunResult),
    /// Results of the last run, filtered for presentation
    Report {
        results: AuditResults,
        plugins: Vec<PluginAudit>,
    },
    /// Raw audit log text
    Log(String),
}

impl OperationResult {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| {
            plaudit_errors::OpsError::SerializationError {
                message: e.to_string(),
            }
            .into()
        })
    }
}
