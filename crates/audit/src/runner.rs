//! Per-plugin audit invocation

use crate::classify::classify;
use crate::tool::AuditTool;
use plaudit_errors::{AuditError, Error};
use plaudit_types::AuditOutcome;
use std::path::Path;
use std::sync::Arc;

/// Runs the audit tool in a plugin's working directory and classifies the result
#[derive(Clone)]
pub struct AuditRunner {
    tool: Arc<dyn AuditTool>,
}

impl AuditRunner {
    #[must_use]
    pub fn new(tool: Arc<dyn AuditTool>) -> Self {
        Self { tool }
    }

    /// Audit one working directory
    ///
    /// A missing directory or manifest means acquisition never produced
    /// anything to audit and is reported as `DownloadFailed`. Every failure
    /// of the tool itself is `AuditIncomplete`.
    pub async fn audit(&self, dir: &Path) -> AuditOutcome {
        if !tokio::fs::try_exists(dir.join("package.json"))
            .await
            .unwrap_or(false)
        {
            return AuditOutcome::download_failed(format!(
                "no package.json in {}",
                dir.display()
            ));
        }

        match self.tool.audit(dir).await {
            Ok(output) => classify(&output.stdout),
            Err(e) => AuditOutcome::incomplete(failure_reason(&e)),
        }
    }
}

fn failure_reason(error: &Error) -> String {
    match error {
        Error::Audit(AuditError::SpawnFailed { message, .. }) => {
            format!("failed to start audit tool: {message}")
        }
        Error::Audit(AuditError::Timeout { seconds, .. }) => format!("timed out after {seconds}s"),
        other => other.to_string(),
    }
}
