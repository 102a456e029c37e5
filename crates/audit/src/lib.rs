#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency audit for plaudit
//!
//! Runs the external audit tool (npm by default) inside each plugin's
//! working directory, classifies its JSON report by worst severity, and
//! folds per-plugin outcomes into the run summary and the audit log.

mod aggregate;
mod classify;
mod runner;
mod tool;

pub use aggregate::{fold, AuditLog, LogBlock};
pub use classify::classify;
pub use runner::AuditRunner;
pub use tool::{AuditTool, CommandAuditTool, ToolCommand, ToolOutput};

use plaudit_events::{AppEvent, AuditEvent, EventEmitter};
use plaudit_types::PluginAudit;

/// Emit the completion event for one classified plugin
pub fn emit_plugin_completed(tx: &impl EventEmitter, audit: &PluginAudit) {
    tx.emit_for_plugin(
        &audit.id,
        AppEvent::Audit(AuditEvent::PluginCompleted {
            plugin: audit.id.clone(),
            category: audit.outcome.category(),
            severity: audit.outcome.severity(),
        }),
    );
}
