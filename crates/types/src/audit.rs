//! Audit outcome types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vulnerability severity levels, ordered from least to most severe.
///
/// `Clean` is the severity of a plugin whose audit found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No vulnerable dependency reported
    #[serde(rename = "none")]
    Clean,
    Info,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// All severities from most to least severe
    pub const DESCENDING: [Severity; 6] = [
        Self::Critical,
        Self::High,
        Self::Moderate,
        Self::Low,
        Self::Info,
        Self::Clean,
    ];

    /// Parse a severity label as emitted by the audit tool.
    ///
    /// Unknown labels yield `None`.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "moderate" | "medium" => Some(Self::Moderate),
            "low" => Some(Self::Low),
            "info" => Some(Self::Info),
            "none" => Some(Self::Clean),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::Info => "info",
            Self::Clean => "none",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl clap::ValueEnum for Severity {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Self::Critical,
            Self::High,
            Self::Moderate,
            Self::Low,
            Self::Info,
            Self::Clean,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Result of auditing one plugin in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The plugin has no known source repository
    NoRepository,
    /// Repository resolution or manifest acquisition failed
    DownloadFailed { reason: String },
    /// The audit tool ran but produced no usable classification
    AuditIncomplete { reason: String },
    /// The audit tool produced a classification
    Audited {
        severity: Severity,
        raw_output: String,
    },
}

impl AuditOutcome {
    #[must_use]
    pub fn download_failed(reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::AuditIncomplete {
            reason: reason.into(),
        }
    }

    /// The summary bucket this outcome counts towards
    #[must_use]
    pub fn category(&self) -> OutcomeCategory {
        match self {
            Self::NoRepository => OutcomeCategory::NoRepo,
            Self::DownloadFailed { .. } => OutcomeCategory::FailedDownload,
            Self::AuditIncomplete { .. } => OutcomeCategory::AuditIncomplete,
            Self::Audited { severity, .. } => match severity {
                Severity::Critical => OutcomeCategory::Critical,
                Severity::High => OutcomeCategory::High,
                Severity::Moderate => OutcomeCategory::Moderate,
                Severity::Low => OutcomeCategory::Low,
                Severity::Info => OutcomeCategory::Info,
                Severity::Clean => OutcomeCategory::NoIssues,
            },
        }
    }

    /// Classified severity, if the audit completed
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Audited { severity, .. } => Some(*severity),
            _ => None,
        }
    }
}

/// Summary buckets; every outcome falls into exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeCategory {
    Critical,
    High,
    Moderate,
    Low,
    Info,
    NoIssues,
    FailedDownload,
    AuditIncomplete,
    NoRepo,
}

/// Per-plugin audit record, in plugin iteration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAudit {
    pub id: String,
    pub name: String,
    pub outcome: AuditOutcome,
}

/// Counts of outcomes per category.
///
/// Only ever derived from a sequence of outcomes; see [`AuditSummary::from_outcomes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
    pub info: usize,
    pub no_issues: usize,
    pub failed_download: usize,
    pub audit_incomplete: usize,
    pub no_repo: usize,
}

impl AuditSummary {
    /// Derive the summary from a sequence of outcomes
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a AuditOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            *summary.counter_mut(outcome.category()) += 1;
        }
        summary
    }

    fn counter_mut(&mut self, category: OutcomeCategory) -> &mut usize {
        match category {
            OutcomeCategory::Critical => &mut self.critical,
            OutcomeCategory::High => &mut self.high,
            OutcomeCategory::Moderate => &mut self.moderate,
            OutcomeCategory::Low => &mut self.low,
            OutcomeCategory::Info => &mut self.info,
            OutcomeCategory::NoIssues => &mut self.no_issues,
            OutcomeCategory::FailedDownload => &mut self.failed_download,
            OutcomeCategory::AuditIncomplete => &mut self.audit_incomplete,
            OutcomeCategory::NoRepo => &mut self.no_repo,
        }
    }

    #[must_use]
    pub fn count(&self, category: OutcomeCategory) -> usize {
        match category {
            OutcomeCategory::Critical => self.critical,
            OutcomeCategory::High => self.high,
            OutcomeCategory::Moderate => self.moderate,
            OutcomeCategory::Low => self.low,
            OutcomeCategory::Info => self.info,
            OutcomeCategory::NoIssues => self.no_issues,
            OutcomeCategory::FailedDownload => self.failed_download,
            OutcomeCategory::AuditIncomplete => self.audit_incomplete,
            OutcomeCategory::NoRepo => self.no_repo,
        }
    }

    /// Sum of every counter; equals the number of plugins in the run
    #[must_use]
    pub fn total(&self) -> usize {
        self.critical
            + self.high
            + self.moderate
            + self.low
            + self.info
            + self.no_issues
            + self.failed_download
            + self.audit_incomplete
            + self.no_repo
    }
}

impl fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} critical, {} high, {} moderate, {} low, {} info, {} no issues, \
             {} failed downloads, {} incomplete audits, {} no repository",
            self.critical,
            self.high,
            self.moderate,
            self.low,
            self.info,
            self.no_issues,
            self.failed_download,
            self.audit_incomplete,
            self.no_repo
        )
    }
}
