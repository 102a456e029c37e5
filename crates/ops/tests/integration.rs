//! Integration tests for the audit run, against mock hosts and a fake audit tool

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;
    use plaudit_audit::{AuditTool, ToolOutput};
    use plaudit_config::Config;
    use plaudit_errors::{Error, OpsError};
    use plaudit_events::{channel, AppEvent, EventReceiver, ProgressEvent};
    use plaudit_net::{NetClient, NetConfig};
    use plaudit_ops::*;
    use plaudit_types::{AuditOutcome, RunPhase, Severity};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tokio_util::sync::CancellationToken;

    const STAMP: &str = "Mon, 01 Jan 2024 00:00:00 GMT";

    /// Answers with a canned report per working directory name
    struct FakeTool {
        outputs: HashMap<String, String>,
        /// Cancelled by the first audit, as Ctrl-C between plugins would
        cancel_on_audit: Option<CancellationToken>,
    }

    impl FakeTool {
        fn canned() -> Self {
            Self {
                outputs: HashMap::from([
                    (
                        "alpha".to_string(),
                        r#"{"vulnerabilities":{"x":{"severity":"moderate"},"y":{"severity":"critical"}}}"#
                            .to_string(),
                    ),
                    ("broken".to_string(), r#"{"error":"ENOLOCK"}"#.to_string()),
                ]),
                cancel_on_audit: None,
            }
        }
    }

    #[async_trait]
    impl AuditTool for FakeTool {
        fn name(&self) -> &str {
            "fake-audit"
        }

        async fn audit(&self, dir: &Path) -> Result<ToolOutput, Error> {
            let id = dir.file_name().unwrap().to_string_lossy().to_string();
            if let Some(cancel) = &self.cancel_on_audit {
                cancel.cancel();
            }
            Ok(ToolOutput {
                status: Some(1),
                stdout: self.outputs.get(&id).cloned().unwrap_or_default(),
                stderr: String::new(),
            })
        }

        async fn synthesize_lockfile(&self, dir: &Path) -> Result<(), Error> {
            tokio::fs::write(dir.join("package-lock.json"), "{}").await?;
            Ok(())
        }
    }

    struct Harness {
        _temp: TempDir,
        installed: PathBuf,
        ctx: OpsCtx,
        rx: EventReceiver,
    }

    impl Harness {
        async fn new(server: &MockServer, installed: &str) -> Self {
            Self::with_tool(server, installed, FakeTool::canned()).await
        }

        async fn with_tool(server: &MockServer, installed: &str, tool: FakeTool) -> Self {
            let temp = tempdir().unwrap();
            let installed_path = temp.path().join("community-plugins.json");
            tokio::fs::write(&installed_path, installed).await.unwrap();

            let mut config = Config::default();
            config.network.registry_url = server.url("/registry.json");
            config.network.api_base = server.url("/api");
            config.network.raw_base = server.url("/raw");

            let net = NetClient::new(NetConfig {
                retry_count: 0,
                retry_delay: Duration::from_millis(1),
                ..NetConfig::default()
            })
            .unwrap();

            let (tx, rx) = channel();
            let ctx = OpsContextBuilder::new()
                .with_config(config)
                .with_event_sender(tx)
                .with_net(net)
                .with_audit_tool(Arc::new(tool))
                .with_cache_dir(temp.path().join("cache"))
                .build()
                .unwrap();

            Self {
                installed: installed_path,
                _temp: temp,
                ctx,
                rx,
            }
        }

        fn run_context(&self) -> RunContext {
            RunContext::new(self.installed.clone()).with_jobs(2)
        }

        fn progress(&mut self) -> Vec<ProgressEvent> {
            let mut events = Vec::new();
            while let Ok(message) = self.rx.try_recv() {
                if let AppEvent::Progress(progress) = message.event {
                    events.push(progress);
                }
            }
            events
        }
    }

    fn serve_file<'a>(server: &'a MockServer, path: &str, body: &str) -> httpmock::Mock<'a> {
        server.mock(|when, then| {
            when.method(HEAD).path(path);
            then.status(200).header("last-modified", STAMP);
        });
        server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(200).header("last-modified", STAMP).body(body);
        })
    }

    fn serve_repo(server: &MockServer, slug: &str, branch: &str) {
        let path = format!("/api/repos/{slug}");
        let body = serde_json::json!({
            "default_branch": branch,
            "pushed_at": "2024-01-01T00:00:00Z"
        });
        server.mock(|when, then| {
            when.method(GET).path(path.as_str());
            then.status(200).json_body(body);
        });
    }

    fn serve_registry(server: &MockServer) {
        serve_file(
            server,
            "/registry.json",
            r#"[
                {"id": "alpha", "name": "Alpha", "author": "a", "description": "", "repo": "o/alpha"},
                {"id": "beta", "name": "Beta", "author": "b", "description": ""},
                {"id": "gamma", "name": "Gamma", "author": "c", "description": "", "repo": "o/missing"},
                {"id": "broken", "name": "Broken", "author": "d", "description": "", "repo": "o/broken"}
            ]"#,
        );
    }

    #[tokio::test]
    async fn test_zero_plugins_finishes_cleanly() {
        let server = MockServer::start();
        let mut harness = Harness::new(&server, "[]").await;

        let result = run_audit(&harness.ctx, harness.run_context()).await.unwrap();
        assert_eq!(result.message, "No plugins installed");
        assert_eq!(result.summary.total(), 0);
        assert!(harness.ctx.layout.root().exists());
        assert!(!harness.ctx.layout.cache_metadata().exists());
        assert!(!harness.ctx.layout.results().exists());

        let progress = harness.progress();
        assert!(matches!(progress.last(), Some(ProgressEvent::Completed { .. })));
        assert_eq!(
            progress.last().and_then(ProgressEvent::final_message),
            Some("No plugins installed")
        );
    }

    #[tokio::test]
    async fn test_orchestrator_ends_in_terminal_phase() {
        let server = MockServer::start();
        let harness = Harness::new(&server, "[]").await;

        let mut orchestrator = Orchestrator::new(&harness.ctx, harness.run_context());
        assert_eq!(orchestrator.phase(), &RunPhase::Idle);
        assert!(!orchestrator.phase().is_terminal());

        orchestrator.execute().await.unwrap();
        assert_eq!(orchestrator.phase(), &RunPhase::Done);
        assert!(orchestrator.phase().is_terminal());
    }

    #[tokio::test]
    async fn test_mixed_run_partitions_every_plugin() {
        let server = MockServer::start();
        serve_registry(&server);
        serve_repo(&server, "o/alpha", "main");
        serve_file(&server, "/raw/o/alpha/main/package.json", "{}");
        serve_file(&server, "/raw/o/alpha/main/package-lock.json", "{}");
        serve_repo(&server, "o/broken", "master");
        serve_file(&server, "/raw/o/broken/master/package.json", "{}");
        server.mock(|when, then| {
            when.method(HEAD).path("/raw/o/broken/master/package-lock.json");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/repos/o/missing");
            then.status(404);
        });

        let mut harness =
            Harness::new(&server, r#"["alpha", "beta", "gamma", "delta", "broken", "alpha"]"#).await;
        let result = run_audit(&harness.ctx, harness.run_context()).await.unwrap();

        let ids: Vec<_> = result.plugins.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta", "gamma", "delta", "broken"]);
        assert_eq!(result.summary.total(), 5);
        assert_eq!(result.summary.critical, 1);
        assert_eq!(result.summary.no_repo, 2);
        assert_eq!(result.summary.failed_download, 1);
        assert_eq!(result.summary.audit_incomplete, 1);

        assert_eq!(result.plugins[0].outcome.severity(), Some(Severity::Critical));
        assert_eq!(result.plugins[1].outcome, AuditOutcome::NoRepository);
        match &result.plugins[2].outcome {
            AuditOutcome::DownloadFailed { reason } => assert!(reason.contains("not found")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(result.plugins[4].outcome, AuditOutcome::incomplete("ENOLOCK"));

        assert!(result.log.contains("=== Beta (beta) ===\nNo repository\n"));
        assert!(result.message.starts_with("Audit complete: 1 critical"));

        let persisted = load_results(&harness.ctx).await.unwrap();
        assert_eq!(persisted.summary, result.summary);
        assert_eq!(read_log(&harness.ctx).await.unwrap(), result.log);

        let alpha = result.records.iter().find(|r| r.id == "alpha").unwrap();
        assert_eq!(alpha.default_branch.as_deref(), Some("main"));
        assert_eq!(alpha.last_updated, Some(1_704_067_200_000));

        let progress = harness.progress();
        let mut last = 0;
        for event in &progress {
            if let ProgressEvent::Updated { percent, .. } = event {
                assert!(*percent >= last, "progress went backwards");
                last = *percent;
            }
        }
        assert_eq!(last, 100);
        assert!(matches!(progress.last(), Some(ProgressEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_second_run_only_probes() {
        let server = MockServer::start();
        serve_registry(&server);
        serve_repo(&server, "o/alpha", "main");
        let manifest_get = serve_file(&server, "/raw/o/alpha/main/package.json", "{}");
        let lockfile_get = serve_file(&server, "/raw/o/alpha/main/package-lock.json", "{}");

        let harness = Harness::new(&server, r#"["alpha"]"#).await;
        let first = run_audit(&harness.ctx, harness.run_context()).await.unwrap();
        let second = run_audit(&harness.ctx, harness.run_context()).await.unwrap();

        assert_eq!(first.log, second.log);
        assert_eq!(first.summary, second.summary);
        manifest_get.assert_hits(1);
        lockfile_get.assert_hits(1);
    }

    #[tokio::test]
    async fn test_forbidden_reuses_previous_files() {
        let server = MockServer::start();
        serve_registry(&server);
        let mut api = server.mock(|when, then| {
            when.method(GET).path("/api/repos/o/alpha");
            then.status(200).json_body(serde_json::json!({
                "default_branch": "main",
                "pushed_at": "2024-01-01T00:00:00Z"
            }));
        });
        serve_file(&server, "/raw/o/alpha/main/package.json", "{}");
        serve_file(&server, "/raw/o/alpha/main/package-lock.json", "{}");

        let harness = Harness::new(&server, r#"["alpha"]"#).await;
        run_audit(&harness.ctx, harness.run_context()).await.unwrap();

        api.delete();
        server.mock(|when, then| {
            when.method(GET).path("/api/repos/o/alpha");
            then.status(403);
        });

        let result = run_audit(&harness.ctx, harness.run_context()).await.unwrap();
        assert_eq!(result.plugins[0].outcome.severity(), Some(Severity::Critical));
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_cancellation() {
        let server = MockServer::start();
        serve_registry(&server);

        let mut harness = Harness::new(&server, r#"["alpha"]"#).await;
        let run = harness.run_context();
        run.cancel.cancel();

        let err = run_audit(&harness.ctx, run).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));

        match harness.progress().last() {
            Some(ProgressEvent::Failed { message, .. }) => assert_eq!(message, "Audit cancelled"),
            other => panic!("unexpected final event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_installed_list_is_structural() {
        let server = MockServer::start();
        let harness = Harness::new(&server, "not json").await;

        let err = run_audit(&harness.ctx, harness.run_context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Ops(OpsError::InstalledListUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_report_without_previous_run() {
        let server = MockServer::start();
        let harness = Harness::new(&server, "[]").await;

        assert!(matches!(
            load_results(&harness.ctx).await.unwrap_err(),
            Error::Ops(OpsError::NoPreviousRun)
        ));
    }

    #[tokio::test]
    async fn test_unchanged_repo_survives_failed_freshness_check() {
        let server = MockServer::start();
        serve_registry(&server);
        serve_repo(&server, "o/alpha", "main");
        let mut manifest_head = server.mock(|when, then| {
            when.method(HEAD).path("/raw/o/alpha/main/package.json");
            then.status(200).header("last-modified", STAMP);
        });
        let manifest_get = server.mock(|when, then| {
            when.method(GET).path("/raw/o/alpha/main/package.json");
            then.status(200).header("last-modified", STAMP).body("{}");
        });
        serve_file(&server, "/raw/o/alpha/main/package-lock.json", "{}");

        let harness = Harness::new(&server, r#"["alpha"]"#).await;
        let first = run_audit(&harness.ctx, harness.run_context()).await.unwrap();
        assert_eq!(first.plugins[0].outcome.severity(), Some(Severity::Critical));

        manifest_head.delete();
        server.mock(|when, then| {
            when.method(HEAD).path("/raw/o/alpha/main/package.json");
            then.status(502);
        });

        let second = run_audit(&harness.ctx, harness.run_context()).await.unwrap();
        assert_eq!(second.plugins[0].outcome.severity(), Some(Severity::Critical));
        assert_eq!(first.log, second.log);
        manifest_get.assert_hits(1);
    }

    #[tokio::test]
    async fn test_blocked_working_dir_ends_the_run() {
        let server = MockServer::start();
        serve_registry(&server);
        serve_repo(&server, "o/alpha", "main");
        serve_file(&server, "/raw/o/alpha/main/package.json", "{}");
        serve_file(&server, "/raw/o/alpha/main/package-lock.json", "{}");

        let mut harness = Harness::new(&server, r#"["alpha"]"#).await;
        let packages = harness.ctx.layout.root().join("packages");
        tokio::fs::create_dir_all(&packages).await.unwrap();
        tokio::fs::write(packages.join("alpha"), "stray file").await.unwrap();

        let err = run_audit(&harness.ctx, harness.run_context())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ops(OpsError::Structural { .. })));
        assert!(!harness.ctx.layout.results().exists());
        assert!(matches!(
            harness.progress().last(),
            Some(ProgressEvent::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_between_audits_keeps_cache_reusable() {
        let server = MockServer::start();
        serve_registry(&server);
        serve_repo(&server, "o/alpha", "main");
        let alpha_get = serve_file(&server, "/raw/o/alpha/main/package.json", "{}");
        serve_file(&server, "/raw/o/alpha/main/package-lock.json", "{}");
        serve_repo(&server, "o/broken", "master");
        let broken_get = serve_file(&server, "/raw/o/broken/master/package.json", "{}");
        server.mock(|when, then| {
            when.method(HEAD).path("/raw/o/broken/master/package-lock.json");
            then.status(404);
        });

        let cancel = CancellationToken::new();
        let tool = FakeTool {
            cancel_on_audit: Some(cancel.clone()),
            ..FakeTool::canned()
        };
        let mut harness = Harness::with_tool(&server, r#"["alpha", "broken"]"#, tool).await;

        let run = harness.run_context().with_cancellation(cancel);
        let err = run_audit(&harness.ctx, run).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!harness.ctx.layout.results().exists());
        match harness.progress().last() {
            Some(ProgressEvent::Failed { message, .. }) => assert_eq!(message, "Audit cancelled"),
            other => panic!("unexpected final event {other:?}"),
        }

        let metadata = std::fs::read(harness.ctx.layout.cache_metadata()).unwrap();
        let metadata: serde_json::Value = serde_json::from_slice(&metadata).unwrap();
        assert!(metadata.get("packages/alpha/package.json").is_some());

        let rerun = run_audit(&harness.ctx, harness.run_context()).await.unwrap();
        assert_eq!(rerun.summary.total(), 2);
        alpha_get.assert_hits(1);
        broken_get.assert_hits(1);
    }
}
