//! Integration tests for types

#[cfg(test)]
mod tests {
    use plaudit_types::*;

    #[test]
    fn test_registry_snapshot_parses() {
        let raw = r#"[
            {"id":"dataview","name":"Dataview","author":"blacksmithgu","description":"d","repo":"blacksmithgu/obsidian-dataview"},
            {"id":"orphan","name":"Orphan","author":"x","description":"y"}
        ]"#;
        let entries: Vec<RegistryEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].repo, None);
    }

    #[test]
    fn test_results_summary_is_derived() {
        let plugins = vec![
            PluginAudit {
                id: "a".into(),
                name: "A".into(),
                outcome: AuditOutcome::Audited {
                    severity: Severity::High,
                    raw_output: String::new(),
                },
            },
            PluginAudit {
                id: "b".into(),
                name: "B".into(),
                outcome: AuditOutcome::download_failed("repository owner/b not found"),
            },
        ];
        let results = AuditResults::new(chrono::Utc::now(), plugins);
        assert_eq!(results.summary.high, 1);
        assert_eq!(results.summary.failed_download, 1);
        assert_eq!(results.summary.total(), 2);

        let json = serde_json::to_string(&results).unwrap();
        let back: AuditResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back, results);
    }

    #[test]
    fn test_cache_entry_defaults_to_downloaded() {
        let entry: FetchCacheEntry =
            serde_json::from_str(r#"{"lastModified":"Tue, 01 Oct 2024 10:00:00 GMT"}"#).unwrap();
        assert!(entry.downloaded);
        assert_eq!(entry.size, None);
    }
}
