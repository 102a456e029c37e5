//! Queries over the persisted results of the last run

use crate::OpsCtx;
use plaudit_errors::{Error, OpsError, StorageError};
use plaudit_store::read_results;
use plaudit_types::{AuditResults, PluginAudit, Severity};

/// Load `results.json` from the last completed run
///
/// # Errors
///
/// Returns `OpsError::NoPreviousRun` when no run has completed yet, or a
/// storage error when the file is corrupted.
pub async fn load_results(ctx: &OpsCtx) -> Result<AuditResults, Error> {
    read_results(&ctx.layout)
        .await?
        .ok_or_else(|| OpsError::NoPreviousRun.into())
}

/// Read the rendered audit log of the last run
///
/// # Errors
///
/// Returns `OpsError::NoPreviousRun` if the log does not exist.
pub async fn read_log(ctx: &OpsCtx) -> Result<String, Error> {
    let path = ctx.layout.audit_log();
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OpsError::NoPreviousRun.into()),
        Err(e) => Err(StorageError::from_io_with_path(&e, &path).into()),
    }
}

/// Plugins for presentation, worst first
///
/// With `min_severity` set only audited plugins at or above it are kept.
/// Ties keep the run order.
#[must_use]
pub fn select_plugins(results: &AuditResults, min_severity: Option<Severity>) -> Vec<PluginAudit> {
    let mut plugins: Vec<PluginAudit> = results
        .plugins
        .iter()
        .filter(|p| match min_severity {
            Some(min) => p.outcome.severity().is_some_and(|s| s >= min),
            None => true,
        })
        .cloned()
        .collect();
    plugins.sort_by_key(|p| std::cmp::Reverse(p.outcome.severity()));
    plugins
}

/// Whether any plugin reached `threshold`
#[must_use]
pub fn exceeds_threshold(plugins: &[PluginAudit], threshold: Severity) -> bool {
    plugins
        .iter()
        .filter_map(|p| p.outcome.severity())
        .any(|s| s >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaudit_types::AuditOutcome;

    fn audit(id: &str, outcome: AuditOutcome) -> PluginAudit {
        PluginAudit {
            id: id.into(),
            name: id.into(),
            outcome,
        }
    }

    fn audited(id: &str, severity: Severity) -> PluginAudit {
        audit(
            id,
            AuditOutcome::Audited {
                severity,
                raw_output: "{}".into(),
            },
        )
    }

    #[test]
    fn selection_sorts_and_filters() {
        let results = AuditResults::new(
            chrono::Utc::now(),
            vec![
                audit("norepo", AuditOutcome::NoRepository),
                audited("low", Severity::Low),
                audited("crit", Severity::Critical),
                audited("clean", Severity::Clean),
            ],
        );

        let all: Vec<_> = select_plugins(&results, None)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(all, vec!["crit", "low", "clean", "norepo"]);

        let serious: Vec<_> = select_plugins(&results, Some(Severity::Moderate))
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(serious, vec!["crit"]);

        assert!(exceeds_threshold(&results.plugins, Severity::High));
        assert!(!exceeds_threshold(
            &[audited("low", Severity::Low)],
            Severity::Moderate
        ));
    }
}
