//! Integration tests for the repository resolver

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use plaudit_errors::{Error, RepoError};
    use plaudit_events::channel;
    use plaudit_net::{NetClient, NetConfig};
    use plaudit_resolver::*;
    use plaudit_types::RepoSlug;
    use std::time::Duration;

    fn resolver(server: &MockServer) -> RepositoryResolver {
        let client = NetClient::new(NetConfig {
            retry_count: 0,
            retry_delay: Duration::from_millis(1),
            ..NetConfig::default()
        })
        .unwrap();
        RepositoryResolver::new(client, server.base_url())
    }

    #[tokio::test]
    async fn test_resolves_branch_and_change() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/owner/plugin")
                .header("accept", "application/vnd.github+json")
                .header("authorization", "Bearer secret");
            then.status(200).json_body(serde_json::json!({
                "default_branch": "develop",
                "pushed_at": "2024-01-02T03:04:05Z"
            }));
        });

        let slug = RepoSlug::parse("owner/plugin").unwrap();
        let fresh = resolver(&server)
            .resolve(&slug, None, Some("secret"), &tx)
            .await
            .unwrap();
        assert_eq!(fresh.branch, "develop");
        assert_eq!(fresh.pushed_at, Some(1_704_164_645_000));
        assert!(fresh.changed);

        let unchanged = resolver(&server)
            .resolve(&slug, Some(1_704_164_645_000), Some("secret"), &tx)
            .await
            .unwrap();
        assert!(!unchanged.changed);
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/repos/owner/missing");
            then.status(404);
        });

        let slug = RepoSlug::parse("owner/missing").unwrap();
        let err = resolver(&server)
            .resolve(&slug, None, None, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Repo(RepoError::NotFound { .. })));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_forbidden_suggests_credential() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/repos/owner/limited");
            then.status(403);
        });

        let slug = RepoSlug::parse("owner/limited").unwrap();
        let err = resolver(&server)
            .resolve(&slug, None, None, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Repo(RepoError::Forbidden { status: 403, .. })));
        assert!(err.to_string().contains("token"));
    }

    #[tokio::test]
    async fn test_unexpected_status() {
        let server = MockServer::start();
        let (tx, _rx) = channel();
        server.mock(|when, then| {
            when.method(GET).path("/repos/owner/teapot");
            then.status(418);
        });

        let slug = RepoSlug::parse("owner/teapot").unwrap();
        let err = resolver(&server)
            .resolve(&slug, None, None, &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Repo(RepoError::Unexpected { status: 418, .. })
        ));
    }
}
