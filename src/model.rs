//! Domain records produced and consumed by the scan pipeline.
//!
//! `Repository`, `Branch` and `PullRequest` are read-only projections of the
//! remote state, fetched fresh on every scan. `HealthRecord` is computed once
//! per repository and `ScanReport` once per invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a scan covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanTarget {
    /// Every repository owned by an organization (or user).
    Organization { org: String },
    /// A single `owner/repo`.
    Repository { owner: String, repo: String },
}

impl ScanTarget {
    /// Parse `org` or `owner/repo`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.split_once('/') {
            None if !value.is_empty() => Some(Self::Organization {
                org: value.to_string(),
            }),
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Some(Self::Repository {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization { org } => write!(f, "{}", org),
            Self::Repository { owner, repo } => write!(f, "{}/{}", owner, repo),
        }
    }
}

/// A repository as listed by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub archived: bool,
    /// Last push (or update) reported by the remote.
    pub last_activity: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Whether the repository saw activity at or after `cutoff`.
    pub fn active_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity.is_some_and(|at| at >= cutoff)
    }
}

/// A branch as listed by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub protected: bool,
    pub head_sha: String,
}

/// Resolved lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

/// A pull request as listed by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author: String,
    pub head_branch: String,
    pub html_url: String,
}

impl PullRequest {
    /// When the pull request stopped being open, preferring the merge time.
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            PrState::Open => None,
            PrState::Merged => self.merged_at.or(self.closed_at),
            PrState::Closed => self.closed_at,
        }
    }
}

/// An open pull request with its age at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPr {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub days_old: i64,
}

/// A branch no pull request ever referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedBranch {
    pub name: String,
    pub head_sha: String,
    /// Author of the head commit, `unknown` when it could not be looked up.
    pub author: String,
}

/// A branch whose latest pull request closed or merged, still on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeletion {
    pub branch: String,
    pub pr_number: u64,
    pub pr_url: String,
    pub author: String,
    pub merged: bool,
    pub closed_at: DateTime<Utc>,
    pub days_since_closed: i64,
}

/// Classification result for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub repository: String,
    pub owner: String,
    pub html_url: String,
    pub total_branches: usize,
    pub excluded_branches: usize,
    pub open_pr_count: usize,
    /// All open pull requests, oldest first.
    pub open_prs: Vec<OpenPr>,
    pub stale_prs: Vec<OpenPr>,
    pub orphaned_branches: Vec<OrphanedBranch>,
    pub pending_deletion: Vec<PendingDeletion>,
    pub has_issues: bool,
    /// Set when the repository could not be fetched; all lists are empty then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Outcomes of inline deletions when auto-delete is enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_deleted: Vec<crate::cleanup::CleanupOutcome>,
}

impl HealthRecord {
    /// A record carrying only an error marker.
    pub fn failed(repo: &Repository, error: impl Into<String>) -> Self {
        Self {
            repository: repo.name.clone(),
            owner: repo.owner.clone(),
            html_url: repo.html_url.clone(),
            total_branches: 0,
            excluded_branches: 0,
            open_pr_count: 0,
            open_prs: Vec::new(),
            stale_prs: Vec::new(),
            orphaned_branches: Vec::new(),
            pending_deletion: Vec::new(),
            has_issues: false,
            error: Some(error.into()),
            auto_deleted: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

/// Thresholds the report was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub stale_pr_days: i64,
    pub inactive_days: i64,
    pub open_pr_warning_count: usize,
}

/// Aggregate counts over a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_repos: usize,
    pub archived_repos: usize,
    pub inactive_repos: usize,
    pub active_repos: usize,
    pub failed_repos: usize,
    pub repos_with_issues: usize,
    pub total_open_prs: usize,
    pub stale_prs: usize,
    pub orphaned_branches: usize,
    pub pending_deletion_branches: usize,
}

/// The structured output of one scan. Built once, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub target: ScanTarget,
    pub generated_at: DateTime<Utc>,
    pub thresholds: Thresholds,
    pub summary: ScanSummary,
    pub records: Vec<HealthRecord>,
}
