//! Plugin identity and registry records

use plaudit_errors::RepoError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the community registry snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repo: Option<String>,
}

/// One installed plugin, as persisted in `installed-manifest.json`.
///
/// `id` is the only stable identity; every other field is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_link: Option<String>,
    /// Epoch millis of the repository's last push (change-detection watermark)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl PluginRecord {
    /// Record for an installed plugin nobody knows anything about.
    #[must_use]
    pub fn unknown(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            author: String::new(),
            description: String::new(),
            repo: None,
            default_branch: None,
            support_link: None,
            last_updated: None,
        }
    }

    /// Build a record from a registry entry, carrying over the resolution
    /// state (`default_branch`, `last_updated`) of a previous record.
    #[must_use]
    pub fn from_registry(entry: &RegistryEntry, prior: Option<&PluginRecord>) -> Self {
        let repo = entry
            .repo
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        // Resolution state only carries over while the repository is the same
        let same_repo = prior.is_some_and(|p| p.repo == repo);
        let mut record = Self {
            id: entry.id.clone(),
            name: if entry.name.is_empty() {
                entry.id.clone()
            } else {
                entry.name.clone()
            },
            author: entry.author.clone(),
            description: entry.description.clone(),
            repo,
            default_branch: prior
                .filter(|_| same_repo)
                .and_then(|p| p.default_branch.clone()),
            support_link: None,
            last_updated: prior.filter(|_| same_repo).and_then(|p| p.last_updated),
        };
        record.refresh_support_link();
        record
    }

    /// Derive `support_link` from `repo`.
    pub fn refresh_support_link(&mut self) {
        self.support_link = self
            .repo
            .as_deref()
            .map(|repo| format!("https://github.com/{repo}"));
    }

    /// Parse the `repo` field, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::InvalidSlug` if `repo` is present but not `owner/name`.
    pub fn slug(&self) -> Result<Option<RepoSlug>, RepoError> {
        self.repo.as_deref().map(RepoSlug::parse).transpose()
    }
}

/// Validated `owner/name` repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    /// Parse an `owner/name` string
    ///
    /// # Errors
    ///
    /// Returns `RepoError::InvalidSlug` unless the input has exactly two
    /// non-empty, whitespace-free segments.
    pub fn parse(raw: &str) -> Result<Self, RepoError> {
        let invalid = || RepoError::InvalidSlug {
            repo: raw.to_string(),
        };
        let mut parts = raw.trim().split('/');
        let owner = parts.next().ok_or_else(invalid)?;
        let name = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some()
            || owner.is_empty()
            || name.is_empty()
            || owner.contains(char::is_whitespace)
            || name.contains(char::is_whitespace)
        {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(repo: Option<&str>) -> RegistryEntry {
        RegistryEntry {
            id: "dataview".into(),
            name: "Dataview".into(),
            author: "blacksmithgu".into(),
            description: "Query your vault".into(),
            repo: repo.map(str::to_string),
        }
    }

    #[test]
    fn test_slug_parsing() {
        let slug = RepoSlug::parse("blacksmithgu/obsidian-dataview").unwrap();
        assert_eq!(slug.owner(), "blacksmithgu");
        assert_eq!(slug.name(), "obsidian-dataview");
        assert_eq!(slug.to_string(), "blacksmithgu/obsidian-dataview");

        for bad in ["", "owner", "owner/", "/name", "a/b/c", "own er/name"] {
            assert!(RepoSlug::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_from_registry_carries_resolution_state() {
        let mut prior = PluginRecord::from_registry(&entry(Some("owner/repo")), None);
        prior.default_branch = Some("master".into());
        prior.last_updated = Some(1_700_000_000_000);

        let merged = PluginRecord::from_registry(&entry(Some("owner/repo")), Some(&prior));
        assert_eq!(merged.default_branch.as_deref(), Some("master"));
        assert_eq!(merged.last_updated, Some(1_700_000_000_000));
        assert_eq!(
            merged.support_link.as_deref(),
            Some("https://github.com/owner/repo")
        );
    }

    #[test]
    fn test_from_registry_drops_state_when_repo_moves() {
        let mut prior = PluginRecord::from_registry(&entry(Some("owner/old")), None);
        prior.default_branch = Some("master".into());
        prior.last_updated = Some(1);

        let merged = PluginRecord::from_registry(&entry(Some("owner/new")), Some(&prior));
        assert_eq!(merged.default_branch, None);
        assert_eq!(merged.last_updated, None);
    }

    #[test]
    fn test_blank_repo_is_no_repo() {
        let record = PluginRecord::from_registry(&entry(Some("  ")), None);
        assert_eq!(record.repo, None);
        assert_eq!(record.support_link, None);
        assert!(record.slug().unwrap().is_none());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let mut record = PluginRecord::unknown("calendar");
        record.default_branch = Some("main".into());
        record.last_updated = Some(42);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["defaultBranch"], "main");
        assert_eq!(json["lastUpdated"], 42);
        assert!(json.get("repo").is_none());
    }
}
