//! Branch and pull request classification.
//!
//! Every branch that is not excluded lands in exactly one bucket:
//!
//! | Bucket              | Condition                                              |
//! |---------------------|--------------------------------------------------------|
//! | healthy (dropped)   | an open PR has this branch as head                     |
//! | pending deletion    | the latest resolved PR on this head closed or merged   |
//! | orphaned            | no PR, open or closed, ever had this branch as head    |
//!
//! A branch is excluded when it is the default branch, is protected on the
//! remote, or carries one of the standard long-lived names.

use crate::github::Gateway;
use crate::github::wire::UNKNOWN_AUTHOR;
use crate::model::{
    Branch, HealthRecord, OpenPr, OrphanedBranch, PendingDeletion, PrState, PullRequest,
    Repository,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Conventional long-lived branch names that are never reported.
pub const STANDARD_BRANCHES: &[&str] = &[
    "main",
    "master",
    "develop",
    "development",
    "dev",
    "staging",
    "stage",
    "prod",
    "production",
    "test",
    "testing",
    "qa",
    "uat",
    "preprod",
    "pre-prod",
    "release",
    "hotfix",
    "stable",
];

/// Set of branch names excluded from analysis, on top of the default and
/// protected branches reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchExclusions {
    names: BTreeSet<String>,
}

impl Default for BranchExclusions {
    fn default() -> Self {
        Self::new(STANDARD_BRANCHES.iter().copied())
    }
}

impl BranchExclusions {
    /// Replace the standard set entirely.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Add names to the set.
    pub fn with_extra<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_excluded(&self, branch: &Branch, default_branch: &str) -> bool {
        branch.name == default_branch || branch.protected || self.contains(&branch.name)
    }
}

/// Thresholds and exclusions applied to every repository.
#[derive(Debug, Clone)]
pub struct ClassifyPolicy {
    pub stale_pr_days: i64,
    pub open_pr_warning_count: usize,
    pub exclusions: BranchExclusions,
}

impl Default for ClassifyPolicy {
    fn default() -> Self {
        Self {
            stale_pr_days: 30,
            open_pr_warning_count: 3,
            exclusions: BranchExclusions::default(),
        }
    }
}

/// The closed or merged PR with the latest resolution time, per head branch.
/// Ties go to the higher PR number.
pub fn latest_resolved_by_branch(prs: &[PullRequest]) -> HashMap<&str, &PullRequest> {
    let mut index: HashMap<&str, &PullRequest> = HashMap::new();
    for pr in prs {
        let Some(resolved) = pr.resolved_at() else {
            continue;
        };
        if pr.head_branch.is_empty() {
            continue;
        }
        index
            .entry(pr.head_branch.as_str())
            .and_modify(|current| {
                let current_at = current.resolved_at();
                if Some(resolved) > current_at
                    || (Some(resolved) == current_at && pr.number > current.number)
                {
                    *current = pr;
                }
            })
            .or_insert(pr);
    }
    index
}

/// Whether an open PR created at `created_at` is past the threshold.
/// An age exactly equal to the threshold is not stale.
pub fn is_stale(created_at: DateTime<Utc>, now: DateTime<Utc>, stale_pr_days: i64) -> bool {
    (now - created_at).num_days() > stale_pr_days
}

/// Classify one repository's branches and pull requests. Pure: identical
/// inputs always produce identical records.
pub fn classify(
    repo: &Repository,
    branches: &[Branch],
    prs: &[PullRequest],
    now: DateTime<Utc>,
    policy: &ClassifyPolicy,
) -> HealthRecord {
    let open_heads: HashSet<&str> = prs
        .iter()
        .filter(|pr| pr.state == PrState::Open)
        .map(|pr| pr.head_branch.as_str())
        .collect();
    let resolved = latest_resolved_by_branch(prs);

    let mut excluded_branches = 0;
    let mut orphaned_branches = Vec::new();
    let mut pending_deletion = Vec::new();

    for branch in branches {
        if policy.exclusions.is_excluded(branch, &repo.default_branch) {
            excluded_branches += 1;
            continue;
        }
        if open_heads.contains(branch.name.as_str()) {
            continue;
        }
        match resolved.get(branch.name.as_str()) {
            Some(pr) => {
                // resolved_at is always Some for indexed PRs
                let closed_at = pr.resolved_at().unwrap_or(pr.created_at);
                pending_deletion.push(PendingDeletion {
                    branch: branch.name.clone(),
                    pr_number: pr.number,
                    pr_url: pr.html_url.clone(),
                    author: pr.author.clone(),
                    merged: pr.state == PrState::Merged,
                    closed_at,
                    days_since_closed: (now - closed_at).num_days(),
                });
            }
            None => orphaned_branches.push(OrphanedBranch {
                name: branch.name.clone(),
                head_sha: branch.head_sha.clone(),
                author: UNKNOWN_AUTHOR.to_string(),
            }),
        }
    }

    let mut open_prs: Vec<OpenPr> = prs
        .iter()
        .filter(|pr| pr.state == PrState::Open)
        .map(|pr| OpenPr {
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            html_url: pr.html_url.clone(),
            created_at: pr.created_at,
            days_old: (now - pr.created_at).num_days(),
        })
        .collect();
    open_prs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.number.cmp(&b.number)));

    let stale_prs: Vec<OpenPr> = open_prs
        .iter()
        .filter(|pr| is_stale(pr.created_at, now, policy.stale_pr_days))
        .cloned()
        .collect();

    let open_pr_count = open_prs.len();
    let has_issues = open_pr_count > policy.open_pr_warning_count
        || !stale_prs.is_empty()
        || !orphaned_branches.is_empty();

    HealthRecord {
        repository: repo.name.clone(),
        owner: repo.owner.clone(),
        html_url: repo.html_url.clone(),
        total_branches: branches.len(),
        excluded_branches,
        open_pr_count,
        open_prs,
        stale_prs,
        orphaned_branches,
        pending_deletion,
        has_issues,
        error: None,
        auto_deleted: Vec::new(),
    }
}

/// Fetch a repository's branches and pull requests and classify them.
///
/// A fetch failure does not propagate: the repository is recorded with an
/// error marker and a warning is logged.
pub async fn fetch_and_classify(
    gateway: &Gateway,
    repo: &Repository,
    now: DateTime<Utc>,
    policy: &ClassifyPolicy,
) -> HealthRecord {
    let fetched = async {
        let branches = gateway.list_branches(&repo.owner, &repo.name).await?;
        let prs = gateway.list_pull_requests(&repo.owner, &repo.name).await?;
        Ok::<_, crate::errors::GatewayError>((branches, prs))
    }
    .await;

    match fetched {
        Ok((branches, prs)) => {
            debug!(
                repo = %repo.full_name(),
                branches = branches.len(),
                pull_requests = prs.len(),
                "fetched repository state"
            );
            let mut record = classify(repo, &branches, &prs, now, policy);
            resolve_orphan_authors(gateway, repo, &mut record.orphaned_branches).await;
            record
        }
        Err(err) => {
            warn!(repo = %repo.full_name(), error = %err, "skipping repository");
            HealthRecord::failed(repo, err.to_string())
        }
    }
}

/// Look up the head commit author of each orphaned branch. A failed lookup
/// leaves the author as `unknown`.
async fn resolve_orphan_authors(gateway: &Gateway, repo: &Repository, orphans: &mut [OrphanedBranch]) {
    for orphan in orphans.iter_mut() {
        let reference = if orphan.head_sha.is_empty() {
            orphan.name.clone()
        } else {
            orphan.head_sha.clone()
        };
        match gateway.commit_author(&repo.owner, &repo.name, &reference).await {
            Ok(author) => orphan.author = author,
            Err(err) => debug!(
                repo = %repo.full_name(),
                branch = %orphan.name,
                error = %err,
                "could not resolve branch author"
            ),
        }
    }
}
