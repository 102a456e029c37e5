//! Folding outcomes into the summary and the human-readable log

use plaudit_types::{AuditOutcome, AuditSummary, PluginAudit};
use std::fmt;

/// One per-plugin block of the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBlock {
    pub id: String,
    pub name: String,
    pub body: String,
}

impl LogBlock {
    fn from_audit(audit: &PluginAudit) -> Self {
        let body = match &audit.outcome {
            AuditOutcome::NoRepository => "No repository".to_string(),
            AuditOutcome::DownloadFailed { reason } => format!("Download failed: {reason}"),
            AuditOutcome::AuditIncomplete { reason } => format!("Audit incomplete: {reason}"),
            AuditOutcome::Audited { raw_output, .. } => raw_output.trim_end().to_string(),
        };
        Self {
            id: audit.id.clone(),
            name: audit.name.clone(),
            body,
        }
    }
}

impl fmt::Display for LogBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ({}) ===", self.name, self.id)?;
        writeln!(f, "{}", self.body)?;
        writeln!(f)
    }
}

/// Ordered per-plugin log, in plugin iteration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLog {
    blocks: Vec<LogBlock>,
}

impl AuditLog {
    #[must_use]
    pub fn blocks(&self) -> &[LogBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn push(&mut self, block: LogBlock) {
        self.blocks.push(block);
    }

    /// The persisted text form
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.blocks.iter().try_for_each(|block| write!(f, "{block}"))
    }
}

/// Fold outcomes into a summary and a log, one counter and one block each
#[must_use]
pub fn fold(audits: &[PluginAudit]) -> (AuditSummary, AuditLog) {
    let summary = AuditSummary::from_outcomes(audits.iter().map(|a| &a.outcome));
    let mut log = AuditLog::default();
    for audit in audits {
        log.push(LogBlock::from_audit(audit));
    }
    (summary, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaudit_types::Severity;

    fn audit(id: &str, outcome: AuditOutcome) -> PluginAudit {
        PluginAudit {
            id: id.to_string(),
            name: id.to_uppercase(),
            outcome,
        }
    }

    #[test]
    fn one_block_and_one_count_per_outcome() {
        let audits = vec![
            audit("b", AuditOutcome::NoRepository),
            audit("a", AuditOutcome::download_failed("repository o/m not found")),
            audit(
                "c",
                AuditOutcome::Audited {
                    severity: Severity::High,
                    raw_output: "{\"x\":1}\n".to_string(),
                },
            ),
            audit("d", AuditOutcome::incomplete("ENOLOCK")),
        ];

        let (summary, log) = fold(&audits);
        assert_eq!(summary.total(), audits.len());
        assert_eq!(summary.no_repo, 1);
        assert_eq!(summary.failed_download, 1);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.audit_incomplete, 1);

        let ids: Vec<_> = log.blocks().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
        assert_eq!(log.blocks()[0].body, "No repository");

        assert_eq!(
            log.render(),
            "=== B (b) ===\nNo repository\n\n\
             === A (a) ===\nDownload failed: repository o/m not found\n\n\
             === C (c) ===\n{\"x\":1}\n\n\
             === D (d) ===\nAudit incomplete: ENOLOCK\n\n"
        );
    }

    #[test]
    fn empty_fold() {
        let (summary, log) = fold(&[]);
        assert_eq!(summary.total(), 0);
        assert!(log.is_empty());
        assert_eq!(log.render(), "");
    }
}
