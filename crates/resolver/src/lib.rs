#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Repository metadata resolution for plaudit
//!
//! One lookup per plugin against the repository host API yields the
//! default branch and the last-push watermark used for change detection.

mod metadata;

pub use metadata::RepoMetadata;

use plaudit_errors::{Error, NetworkError, RepoError};
use plaudit_events::{AppEvent, EventEmitter, RepoEvent};
use plaudit_net::NetClient;
use plaudit_types::RepoSlug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;

/// Outcome of a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub branch: String,
    /// Last push as epoch milliseconds, the new watermark
    pub pushed_at: Option<i64>,
    /// Whether the watermark moved since the previous audit
    pub changed: bool,
}

/// Looks up repositories on the host API
#[derive(Clone)]
pub struct RepositoryResolver {
    client: NetClient,
    api_base: String,
}

impl RepositoryResolver {
    #[must_use]
    pub fn new(client: NetClient, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    /// Resolve the default branch and change status of `slug`
    ///
    /// `changed` is true whenever the push timestamp differs from
    /// `prior_last_updated`, including when there was no prior value.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::NotFound` for a 404, `RepoError::Forbidden` for
    /// 401/403/429, `RepoError::Unexpected` for other non-success statuses,
    /// `RepoError::InvalidMetadata` for an unusable body, and network errors
    /// for transport failures.
    pub async fn resolve(
        &self,
        slug: &RepoSlug,
        prior_last_updated: Option<i64>,
        credential: Option<&str>,
        tx: &impl EventEmitter,
    ) -> Result<Resolution, Error> {
        let repo = slug.to_string();
        let url = plaudit_net::join_segments(&self.api_base, &["repos", slug.owner(), slug.name()])?;
        let headers = request_headers(credential)?;

        let response = match self.client.get_with_headers(&url, &headers).await {
            Ok(response) => response,
            Err(Error::Network(NetworkError::RateLimited { .. })) => {
                return Err(RepoError::Forbidden {
                    repo,
                    status: StatusCode::TOO_MANY_REQUESTS.as_u16(),
                }
                .into());
            }
            Err(e) => return Err(e),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&repo, status).into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| NetworkError::DownloadFailed(e.to_string()))?;
        let metadata = RepoMetadata::parse(&repo, &body)?;
        let pushed_at = metadata.pushed_at_millis(&repo)?;
        let changed = pushed_at != prior_last_updated;

        tx.emit_debug(format!(
            "{repo}: branch {} pushed_at {pushed_at:?} changed {changed}",
            metadata.default_branch
        ));

        Ok(Resolution {
            branch: metadata.default_branch,
            pushed_at,
            changed,
        })
    }

    /// [`Self::resolve`] with start/finish events correlated to `plugin_id`
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve`].
    pub async fn resolve_for_plugin(
        &self,
        plugin_id: &str,
        slug: &RepoSlug,
        prior_last_updated: Option<i64>,
        credential: Option<&str>,
        tx: &impl EventEmitter,
    ) -> Result<Resolution, Error> {
        tx.emit_for_plugin(
            plugin_id,
            AppEvent::Repo(RepoEvent::ResolveStarted {
                plugin: plugin_id.to_string(),
                repo: slug.to_string(),
            }),
        );

        let resolution = self
            .resolve(slug, prior_last_updated, credential, tx)
            .await?;

        tx.emit_for_plugin(
            plugin_id,
            AppEvent::Repo(RepoEvent::Resolved {
                plugin: plugin_id.to_string(),
                repo: slug.to_string(),
                branch: resolution.branch.clone(),
                changed: resolution.changed,
            }),
        );
        Ok(resolution)
    }
}

fn request_headers(credential: Option<&str>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    if let Some(token) = credential.map(str::trim).filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::internal("credential contains invalid header characters"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

fn status_error(repo: &str, status: StatusCode) -> RepoError {
    match status {
        StatusCode::NOT_FOUND => RepoError::NotFound {
            repo: repo.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            RepoError::Forbidden {
                repo: repo.to_string(),
                status: status.as_u16(),
            }
        }
        _ => RepoError::Unexpected {
            repo: repo.to_string(),
            status: status.as_u16(),
        },
    }
}
