//! Repository host metadata payload

use chrono::DateTime;
use plaudit_errors::RepoError;
use serde::Deserialize;

/// The subset of the repository document the audit needs
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    pub default_branch: String,
    /// RFC 3339; null for repositories that were never pushed to
    #[serde(default)]
    pub pushed_at: Option<String>,
}

impl RepoMetadata {
    /// Parse the response body of `GET /repos/{owner}/{name}`
    ///
    /// # Errors
    ///
    /// Returns `RepoError::InvalidMetadata` if the body is not the expected
    /// JSON shape or the branch is blank.
    pub fn parse(repo: &str, body: &str) -> Result<Self, RepoError> {
        let metadata: Self =
            serde_json::from_str(body).map_err(|e| RepoError::InvalidMetadata {
                repo: repo.to_string(),
                message: e.to_string(),
            })?;
        if metadata.default_branch.trim().is_empty() {
            return Err(RepoError::InvalidMetadata {
                repo: repo.to_string(),
                message: "empty default_branch".to_string(),
            });
        }
        Ok(metadata)
    }

    /// Last push as epoch milliseconds
    ///
    /// # Errors
    ///
    /// Returns `RepoError::InvalidMetadata` if `pushed_at` is not RFC 3339.
    pub fn pushed_at_millis(&self, repo: &str) -> Result<Option<i64>, RepoError> {
        self.pushed_at
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|ts| ts.timestamp_millis())
                    .map_err(|e| RepoError::InvalidMetadata {
                        repo: repo.to_string(),
                        message: format!("pushed_at '{raw}': {e}"),
                    })
            })
            .transpose()
    }
}
