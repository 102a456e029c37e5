//! Classification of audit tool JSON output

use plaudit_types::{AuditOutcome, Severity};
use serde_json::{Map, Value};

/// Classify the standard output of one audit run
///
/// The plugin severity is the maximum over every reported vulnerable
/// dependency. An explicit `error` field, empty output, or output that is
/// not a JSON object yields `AuditIncomplete`.
#[must_use]
pub fn classify(stdout: &str) -> AuditOutcome {
    let raw = stdout.trim_end();
    if raw.trim().is_empty() {
        return AuditOutcome::incomplete("audit tool produced no output");
    }

    let document: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return AuditOutcome::incomplete(format!("unparsable audit output: {e}")),
    };
    let Some(object) = document.as_object() else {
        return AuditOutcome::incomplete("unparsable audit output: expected a JSON object");
    };

    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
        return AuditOutcome::incomplete(error_reason(error));
    }

    match severity_of(object) {
        Some(severity) => AuditOutcome::Audited {
            severity,
            raw_output: raw.to_string(),
        },
        None => AuditOutcome::incomplete("unrecognized audit output: no vulnerability report"),
    }
}

fn error_reason(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => {
            let code = fields.get("code").and_then(Value::as_str);
            let summary = fields
                .get("summary")
                .or_else(|| fields.get("message"))
                .and_then(Value::as_str)
                .map(|s| s.lines().next().unwrap_or_default());
            match (code, summary) {
                (Some(code), Some(summary)) if !summary.is_empty() => format!("{code}: {summary}"),
                (Some(code), _) => code.to_string(),
                (None, Some(summary)) if !summary.is_empty() => summary.to_string(),
                _ => error.to_string(),
            }
        }
        other => other.to_string(),
    }
}

/// Highest severity in the report, `None` if the document has no report at all
fn severity_of(object: &Map<String, Value>) -> Option<Severity> {
    // npm 7+: vulnerabilities.<dependency>.severity
    if let Some(Value::Object(entries)) = object.get("vulnerabilities") {
        return Some(max_listed(entries));
    }
    // npm 6: advisories.<id>.severity
    if let Some(Value::Object(entries)) = object.get("advisories") {
        return Some(max_listed(entries));
    }
    // metadata.vulnerabilities: { critical: n, high: n, ... }
    if let Some(Value::Object(counts)) = object
        .get("metadata")
        .and_then(|m| m.get("vulnerabilities"))
    {
        let severity = counts
            .iter()
            .filter(|(_, count)| count.as_u64().is_some_and(|n| n > 0))
            .filter_map(|(label, _)| Severity::parse(label))
            .max()
            .unwrap_or(Severity::Clean);
        return Some(severity);
    }
    None
}

fn max_listed(entries: &Map<String, Value>) -> Severity {
    entries
        .values()
        .filter_map(|entry| entry.get("severity").and_then(Value::as_str))
        .filter_map(Severity::parse)
        .max()
        .unwrap_or(Severity::Clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn npm7(severities: &[&str]) -> String {
        let entries: Map<String, Value> = severities
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("dep{i}"), serde_json::json!({ "severity": s })))
            .collect();
        serde_json::json!({ "auditReportVersion": 2, "vulnerabilities": entries }).to_string()
    }

    #[test]
    fn maximum_severity_wins() {
        let outcome = classify(&npm7(&["low", "critical", "moderate"]));
        assert_eq!(outcome.severity(), Some(Severity::Critical));
    }

    #[test]
    fn empty_report_is_clean() {
        let outcome = classify(&npm7(&[]));
        assert_eq!(outcome.severity(), Some(Severity::Clean));
    }

    #[test]
    fn explicit_error_is_incomplete() {
        assert_eq!(
            classify(r#"{"error":"ENOLOCK"}"#),
            AuditOutcome::incomplete("ENOLOCK")
        );
        assert_eq!(
            classify(r#"{"error":{"code":"ENOLOCK","summary":"This command requires an existing lockfile.\nTry again"}}"#),
            AuditOutcome::incomplete("ENOLOCK: This command requires an existing lockfile.")
        );
    }

    #[test]
    fn garbage_is_incomplete() {
        for output in ["", "   \n", "npm ERR! oops", "[1,2]", r#"{"foo":1}"#] {
            assert!(
                matches!(classify(output), AuditOutcome::AuditIncomplete { .. }),
                "{output:?}"
            );
        }
    }

    #[test]
    fn npm6_advisories() {
        let output = r#"{"advisories":{"118":{"severity":"high"},"119":{"severity":"low"}},"metadata":{}}"#;
        assert_eq!(classify(output).severity(), Some(Severity::High));
    }

    #[test]
    fn metadata_counts_fallback() {
        let output = r#"{"metadata":{"vulnerabilities":{"info":0,"low":2,"moderate":1,"high":0,"critical":0,"total":3}}}"#;
        assert_eq!(classify(output).severity(), Some(Severity::Moderate));
    }

    #[test]
    fn unknown_labels_are_ignored() {
        let outcome = classify(&npm7(&["bogus", "info"]));
        assert_eq!(outcome.severity(), Some(Severity::Info));
    }

    #[test]
    fn raw_output_is_trimmed() {
        let outcome = classify(&format!("{}\n\n", npm7(&["low"])));
        match outcome {
            AuditOutcome::Audited { raw_output, .. } => assert!(!raw_output.ends_with('\n')),
            other => panic!("unexpected {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn severity_is_the_maximum(picks in proptest::collection::vec(0usize..5, 1..12)) {
            let labels = ["info", "low", "moderate", "high", "critical"];
            let chosen: Vec<&str> = picks.iter().map(|i| labels[*i]).collect();
            let expected = chosen.iter().filter_map(|l| Severity::parse(l)).max();
            prop_assert_eq!(classify(&npm7(&chosen)).severity(), expected);
        }
    }
}
