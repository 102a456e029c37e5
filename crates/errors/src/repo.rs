//! Repository host resolution error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RepoError {
    #[error("repository {repo} not found (invalid, renamed or deleted)")]
    NotFound { repo: String },

    #[error(
        "access to repository {repo} forbidden (HTTP {status}): rate limited or unauthenticated, supply a GitHub token"
    )]
    Forbidden { repo: String, status: u16 },

    #[error("unexpected response for repository {repo}: HTTP {status}")]
    Unexpected { repo: String, status: u16 },

    #[error("invalid repository identifier '{repo}': expected owner/name")]
    InvalidSlug { repo: String },

    #[error("invalid repository metadata for {repo}: {message}")]
    InvalidMetadata { repo: String, message: String },
}

impl RepoError {
    /// Whether falling back to a previous run's artifacts is meaningful.
    ///
    /// A repository that no longer exists has no valid cached state.
    #[must_use]
    pub fn allows_cache_fallback(&self) -> bool {
        matches!(
            self,
            Self::Forbidden { .. } | Self::Unexpected { .. } | Self::InvalidMetadata { .. }
        )
    }
}

impl UserFacingError for RepoError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Forbidden { .. } => Some(
                "Supply a GitHub token with --token or PLAUDIT_GITHUB_TOKEN to raise the rate limit.",
            ),
            Self::NotFound { .. } | Self::InvalidSlug { .. } => {
                Some("The plugin's registry entry points at a repository that does not exist.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Forbidden { .. } | Self::Unexpected { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "repo.not_found",
            Self::Forbidden { .. } => "repo.forbidden",
            Self::Unexpected { .. } => "repo.unexpected",
            Self::InvalidSlug { .. } => "repo.invalid_slug",
            Self::InvalidMetadata { .. } => "repo.invalid_metadata",
        };
        Some(code)
    }
}
