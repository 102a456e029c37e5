//! Integration tests for store crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;
    use plaudit_errors::{Error, OpsError};
    use plaudit_events::{channel, AppEvent, FetchEvent, GeneralEvent};
    use plaudit_net::{NetClient, NetConfig};
    use plaudit_store::*;
    use plaudit_types::{AuditOutcome, AuditResults, PluginAudit, PluginRecord, Severity};
    use std::time::Duration;
    use tempfile::tempdir;

    fn client() -> NetClient {
        NetClient::new(NetConfig {
            retry_count: 0,
            retry_delay: Duration::from_millis(1),
            ..NetConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_installed_list_dedupes_in_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("community-plugins.json");
        tokio::fs::write(&path, r#"["b", "a", "b", "", "c"]"#)
            .await
            .unwrap();

        let ids = read_installed_list(&path).await.unwrap();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_installed_list_missing_is_structural() {
        let temp = tempdir().unwrap();
        let err = read_installed_list(&temp.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ops(OpsError::InstalledListUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_documents_roundtrip_through_layout() {
        let temp = tempdir().unwrap();
        let layout = CacheLayout::new(temp.path().to_path_buf());
        layout.ensure().await.unwrap();

        assert!(read_manifest(&layout).await.unwrap().is_empty());
        assert!(read_results(&layout).await.unwrap().is_none());

        let records = vec![PluginRecord::unknown("solo")];
        write_manifest(&layout, &records).await.unwrap();
        assert_eq!(read_manifest(&layout).await.unwrap(), records);

        let results = AuditResults::new(
            chrono::Utc::now(),
            vec![PluginAudit {
                id: "solo".into(),
                name: "Solo".into(),
                outcome: AuditOutcome::Audited {
                    severity: Severity::High,
                    raw_output: "{}".into(),
                },
            }],
        );
        write_results(&layout, &results).await.unwrap();
        let loaded = read_results(&layout).await.unwrap().unwrap();
        assert_eq!(loaded.summary.high, 1);

        write_log(&layout, "=== Solo (solo) ===\n{}\n\n").await.unwrap();
        assert!(layout.audit_log().exists());
    }

    #[tokio::test]
    async fn test_conditional_fetch_reuses_fresh_copy() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        let temp = tempdir().unwrap();
        let layout = CacheLayout::new(temp.path().to_path_buf());
        let cache = FetchCache::empty(layout.cache_metadata());

        let head = server.mock(|when, then| {
            when.method(HEAD).path("/o/r/main/package.json");
            then.status(200)
                .header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT");
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/o/r/main/package.json");
            then.status(200)
                .header("last-modified", "Mon, 01 Jan 2024 00:00:00 GMT")
                .body("{}");
        });

        let key = CacheLayout::package_key("p", MANIFEST_FILE);
        let dest = layout.package_dir("p").join(MANIFEST_FILE);
        let url = server.url("/o/r/main/package.json");

        let first = cache
            .fetch(&client(), &key, &url, &dest, false, &tx)
            .await
            .unwrap();
        assert_eq!(first, FetchStatus::Downloaded { bytes: 2 });

        let second = cache
            .fetch(&client(), &key, &url, &dest, false, &tx)
            .await
            .unwrap();
        assert_eq!(second, FetchStatus::Reused);

        head.assert_hits(2);
        get.assert_hits(1);

        let persisted = FetchCache::load(layout.cache_metadata()).await.unwrap();
        assert_eq!(
            persisted.get(&key).await.unwrap().last_modified.as_deref(),
            Some("Mon, 01 Jan 2024 00:00:00 GMT")
        );

        let mut saw_hit = false;
        while let Ok(message) = rx.try_recv() {
            if matches!(message.event, AppEvent::Fetch(FetchEvent::CacheHit { .. })) {
                saw_hit = true;
            }
        }
        assert!(saw_hit);
    }

    #[tokio::test]
    async fn test_conditional_fetch_force_downloads() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let temp = tempdir().unwrap();
        let cache = FetchCache::empty(temp.path().join("cache-metadata.json"));

        server.mock(|when, then| {
            when.method(HEAD).path("/f");
            then.status(200).header("last-modified", "same");
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/f");
            then.status(200).body("x");
        });

        let dest = temp.path().join("f");
        let url = server.url("/f");
        cache.fetch(&client(), "f", &url, &dest, false, &tx).await.unwrap();
        cache.fetch(&client(), "f", &url, &dest, true, &tx).await.unwrap();
        get.assert_hits(2);
    }

    #[tokio::test]
    async fn test_conditional_fetch_absent() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let temp = tempdir().unwrap();
        let cache = FetchCache::empty(temp.path().join("cache-metadata.json"));

        server.mock(|when, then| {
            when.method(HEAD).path("/lock");
            then.status(404);
        });

        let status = cache
            .fetch(
                &client(),
                "packages/p/package-lock.json",
                &server.url("/lock"),
                &temp.path().join("lock"),
                false,
                &tx,
            )
            .await
            .unwrap();
        assert_eq!(status, FetchStatus::Absent);
        assert!(!status.is_available());
        assert!(!cache
            .get("packages/p/package-lock.json")
            .await
            .unwrap()
            .downloaded);
    }

    #[tokio::test]
    async fn test_failed_freshness_check_keeps_downloaded_copy() {
        let server = MockServer::start();
        let (tx, mut rx) = channel();
        let temp = tempdir().unwrap();
        let layout = CacheLayout::new(temp.path().to_path_buf());
        let cache = FetchCache::empty(layout.cache_metadata());

        let mut head = server.mock(|when, then| {
            when.method(HEAD).path("/o/r/main/package.json");
            then.status(200).header("last-modified", "Mon");
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/o/r/main/package.json");
            then.status(200).body(r#"{"name":"r"}"#);
        });

        let key = CacheLayout::package_key("p", MANIFEST_FILE);
        let dest = layout.package_dir("p").join(MANIFEST_FILE);
        let url = server.url("/o/r/main/package.json");
        cache
            .fetch(&client(), &key, &url, &dest, false, &tx)
            .await
            .unwrap();

        head.delete();
        server.mock(|when, then| {
            when.method(HEAD).path("/o/r/main/package.json");
            then.status(502);
        });
        while rx.try_recv().is_ok() {}

        let status = cache
            .fetch(&client(), &key, &url, &dest, false, &tx)
            .await
            .unwrap();
        assert_eq!(status, FetchStatus::Reused);
        get.assert_hits(1);
        assert_eq!(
            tokio::fs::read_to_string(&dest).await.unwrap(),
            r#"{"name":"r"}"#
        );

        let mut warned = false;
        while let Ok(message) = rx.try_recv() {
            match message.event {
                AppEvent::General(GeneralEvent::Warning { .. }) => warned = true,
                AppEvent::Fetch(FetchEvent::Failed { .. }) => panic!("fallback must not fail"),
                _ => {}
            }
        }
        assert!(warned);
    }

    #[tokio::test]
    async fn test_failed_freshness_check_without_copy_is_an_error() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let temp = tempdir().unwrap();
        let cache = FetchCache::empty(temp.path().join("cache-metadata.json"));

        server.mock(|when, then| {
            when.method(HEAD).path("/f");
            then.status(502);
        });

        let err = cache
            .fetch(
                &client(),
                "f",
                &server.url("/f"),
                &temp.path().join("f"),
                false,
                &tx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_forced_fetch_does_not_fall_back() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let temp = tempdir().unwrap();
        let cache = FetchCache::empty(temp.path().join("cache-metadata.json"));
        let dest = temp.path().join("f");

        cache
            .record_fetch("f", Some("Mon".into()), Some(1))
            .await
            .unwrap();
        tokio::fs::write(&dest, "x").await.unwrap();
        server.mock(|when, then| {
            when.method(HEAD).path("/f");
            then.status(503);
        });

        let result = cache
            .fetch(&client(), "f", &server.url("/f"), &dest, true, &tx)
            .await;
        assert!(result.is_err());
    }
}
