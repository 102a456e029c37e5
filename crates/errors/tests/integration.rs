//! Integration tests for error types

#[cfg(test)]
mod tests {
    use plaudit_errors::*;

    #[test]
    fn test_error_conversion() {
        let net_err = NetworkError::Timeout {
            url: "https://example.com".into(),
        };
        let err: Error = net_err.into();
        assert!(matches!(err, Error::Network(_)));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::DiskFull {
            path: "/tmp/plaudit".into(),
        };
        assert_eq!(err.to_string(), "no space left on device for /tmp/plaudit");
    }

    #[test]
    fn test_error_clone() {
        let err = RepoError::NotFound {
            repo: "owner/missing".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let path = std::path::Path::new("/tmp/cache");
        let storage_err = StorageError::from_io_with_path(&io_err, path);
        assert!(matches!(storage_err, StorageError::PermissionDenied { .. }));
    }

    #[test]
    fn test_file_blocking_cache_directory() {
        let io_err = std::io::Error::from(std::io::ErrorKind::AlreadyExists);
        let path = std::path::Path::new("/tmp/cache/packages/alpha");
        let err: Error = StorageError::from_io_with_path(&io_err, path).into();
        assert!(matches!(
            err,
            Error::Storage(StorageError::NotADirectory { .. })
        ));
        assert_eq!(err.user_code(), Some("storage.not_a_directory"));
        assert!(err.user_hint().is_some());
    }

    #[test]
    fn test_not_found_mentions_not_found() {
        let err = RepoError::NotFound {
            repo: "owner/missing".into(),
        };
        assert!(err.to_string().contains("not found"));
        assert!(!err.allows_cache_fallback());
    }

    #[test]
    fn test_forbidden_suggests_token() {
        let err: Error = RepoError::Forbidden {
            repo: "owner/name".into(),
            status: 403,
        }
        .into();
        assert!(err.user_message().contains("token"));
        assert!(err.user_hint().is_some_and(|hint| hint.contains("token")));
        assert_eq!(err.user_code(), Some("repo.forbidden"));
        assert!(err.is_retryable());
    }
}
