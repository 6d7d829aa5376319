//! Bulk cleanup of classified items.
//!
//! The executor takes a target category, builds a plan from the health records
//! and runs every item independently over a bounded pool. One item failing
//! never stops the others; each item gets its own outcome. In dry-run mode the
//! plan is reported without issuing a single write.

use crate::github::{Gateway, MutationResult};
use crate::model::HealthRecord;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Which classified items a cleanup run acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupTarget {
    /// Orphaned and closed/merged-pending-deletion branches.
    Branches,
    /// Only closed/merged-pending-deletion branches (auto-delete).
    PendingDeletionBranches,
    /// Stale open pull requests.
    StalePullRequests,
}

/// Why a branch is scheduled for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchCategory {
    Orphaned,
    PendingDeletion,
}

/// One planned write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CleanupItem {
    DeleteBranch {
        owner: String,
        repo: String,
        branch: String,
        category: BranchCategory,
    },
    ClosePullRequest {
        owner: String,
        repo: String,
        number: u64,
    },
}

impl fmt::Display for CleanupItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteBranch {
                owner,
                repo,
                branch,
                category,
            } => {
                let why = match category {
                    BranchCategory::Orphaned => "orphaned",
                    BranchCategory::PendingDeletion => "closed/merged PR",
                };
                write!(f, "delete branch {}/{}:{} ({})", owner, repo, branch, why)
            }
            Self::ClosePullRequest {
                owner,
                repo,
                number,
            } => write!(f, "close PR {}/{}#{}", owner, repo, number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Deleted,
    Closed,
    /// Dry run: the write would have been issued.
    Planned,
    Failed,
}

/// Result for a single planned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub item: CleanupItem,
    pub status: OutcomeStatus,
    /// Set when the remote was already in the requested state.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CleanupOutcome {
    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Counts over a batch of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub succeeded: usize,
    pub planned: usize,
    pub failed: usize,
}

impl CleanupSummary {
    pub fn of(outcomes: &[CleanupOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.status {
                OutcomeStatus::Deleted | OutcomeStatus::Closed => acc.succeeded += 1,
                OutcomeStatus::Planned => acc.planned += 1,
                OutcomeStatus::Failed => acc.failed += 1,
            }
            acc
        })
    }
}

/// Items `target` selects from `records`, in record order. Records carrying
/// an error marker contribute nothing.
pub fn plan(target: CleanupTarget, records: &[HealthRecord]) -> Vec<CleanupItem> {
    let mut items = Vec::new();
    for record in records.iter().filter(|r| !r.is_error()) {
        let branch = |name: &str, category| CleanupItem::DeleteBranch {
            owner: record.owner.clone(),
            repo: record.repository.clone(),
            branch: name.to_string(),
            category,
        };
        match target {
            CleanupTarget::Branches => {
                items.extend(
                    record
                        .orphaned_branches
                        .iter()
                        .map(|b| branch(&b.name, BranchCategory::Orphaned)),
                );
                items.extend(
                    record
                        .pending_deletion
                        .iter()
                        .map(|p| branch(&p.branch, BranchCategory::PendingDeletion)),
                );
            }
            CleanupTarget::PendingDeletionBranches => {
                items.extend(
                    record
                        .pending_deletion
                        .iter()
                        .map(|p| branch(&p.branch, BranchCategory::PendingDeletion)),
                );
            }
            CleanupTarget::StalePullRequests => {
                items.extend(record.stale_prs.iter().map(|pr| CleanupItem::ClosePullRequest {
                    owner: record.owner.clone(),
                    repo: record.repository.clone(),
                    number: pr.number,
                }));
            }
        }
    }
    items
}

/// Runs cleanup plans against the remote.
#[derive(Clone)]
pub struct CleanupExecutor {
    gateway: Gateway,
    concurrency: usize,
    dry_run: bool,
}

impl CleanupExecutor {
    pub fn new(gateway: Gateway, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency: concurrency.max(1),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Delete every orphaned and closed/merged-pending-deletion branch.
    pub async fn delete_orphaned_branches(&self, records: &[HealthRecord]) -> Vec<CleanupOutcome> {
        self.run(CleanupTarget::Branches, records).await
    }

    /// Close every stale pull request.
    pub async fn close_stale_prs(&self, records: &[HealthRecord]) -> Vec<CleanupOutcome> {
        self.run(CleanupTarget::StalePullRequests, records).await
    }

    /// Plan and execute `target` over `records`.
    pub async fn run(&self, target: CleanupTarget, records: &[HealthRecord]) -> Vec<CleanupOutcome> {
        let items = plan(target, records);
        info!(?target, items = items.len(), dry_run = self.dry_run, "running cleanup");
        self.execute(items).await
    }

    /// Execute items independently; outcomes come back in item order.
    pub async fn execute(&self, items: Vec<CleanupItem>) -> Vec<CleanupOutcome> {
        stream::iter(items)
            .map(|item| self.execute_one(item))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn execute_one(&self, item: CleanupItem) -> CleanupOutcome {
        if self.dry_run {
            info!(%item, "dry run");
            return CleanupOutcome {
                item,
                status: OutcomeStatus::Planned,
                already_done: false,
                error: None,
            };
        }

        let (result, success) = match &item {
            CleanupItem::DeleteBranch {
                owner,
                repo,
                branch,
                ..
            } => (
                self.gateway.delete_branch(owner, repo, branch).await,
                OutcomeStatus::Deleted,
            ),
            CleanupItem::ClosePullRequest {
                owner,
                repo,
                number,
            } => (
                self.gateway.close_pull_request(owner, repo, *number).await,
                OutcomeStatus::Closed,
            ),
        };

        match result {
            Ok(mutation) => {
                let already_done = mutation == MutationResult::AlreadyDone;
                info!(%item, already_done, "done");
                CleanupOutcome {
                    item,
                    status: success,
                    already_done,
                    error: None,
                }
            }
            Err(err) => {
                let message = if err.is_auth() {
                    format!("{} (the token needs write access to this repository)", err)
                } else {
                    err.to_string()
                };
                warn!(%item, error = %message, "cleanup item failed");
                CleanupOutcome {
                    item,
                    status: OutcomeStatus::Failed,
                    already_done: false,
                    error: Some(message),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::{ScriptedTransport, json_response, status_response};
    use crate::github::{GatewayConfig, RetryPolicy};
    use crate::model::{OpenPr, OrphanedBranch, PendingDeletion};
    use chrono::Utc;
    use std::sync::Arc;

    fn record(repo: &str, orphaned: &[&str], pending: &[&str], stale: &[u64]) -> HealthRecord {
        HealthRecord {
            repository: repo.into(),
            owner: "acme".into(),
            html_url: String::new(),
            total_branches: orphaned.len() + pending.len(),
            excluded_branches: 0,
            open_pr_count: stale.len(),
            open_prs: Vec::new(),
            stale_prs: stale
                .iter()
                .map(|n| OpenPr {
                    number: *n,
                    title: String::new(),
                    author: "octo".into(),
                    html_url: String::new(),
                    created_at: Utc::now(),
                    days_old: 90,
                })
                .collect(),
            orphaned_branches: orphaned
                .iter()
                .map(|n| OrphanedBranch {
                    name: n.to_string(),
                    head_sha: String::new(),
                    author: "unknown".into(),
                })
                .collect(),
            pending_deletion: pending
                .iter()
                .enumerate()
                .map(|(i, n)| PendingDeletion {
                    branch: n.to_string(),
                    pr_number: i as u64 + 100,
                    pr_url: String::new(),
                    author: "octo".into(),
                    merged: true,
                    closed_at: Utc::now(),
                    days_since_closed: 1,
                })
                .collect(),
            has_issues: !orphaned.is_empty() || !stale.is_empty(),
            error: None,
            auto_deleted: Vec::new(),
        }
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> Gateway {
        Gateway::with_transport(
            transport,
            &GatewayConfig {
                api_url: "https://api.test".into(),
                token: Some("ghp_test".into()),
                retry: RetryPolicy::immediate(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_plan_branches_covers_both_categories() {
        let records = vec![record("widgets", &["old"], &["done"], &[7])];
        let items = plan(CleanupTarget::Branches, &records);
        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[0],
            CleanupItem::DeleteBranch { branch, category: BranchCategory::Orphaned, .. } if branch == "old"
        ));
        assert!(matches!(
            &items[1],
            CleanupItem::DeleteBranch { category: BranchCategory::PendingDeletion, .. }
        ));
    }

    #[test]
    fn test_plan_pending_only_never_touches_orphans() {
        let records = vec![record("widgets", &["old", "spike"], &["done"], &[])];
        let items = plan(CleanupTarget::PendingDeletionBranches, &records);
        assert_eq!(items.len(), 1);
        assert!(items.iter().all(|i| matches!(
            i,
            CleanupItem::DeleteBranch { category: BranchCategory::PendingDeletion, .. }
        )));
    }

    #[test]
    fn test_plan_skips_error_records() {
        let mut failed = record("broken", &["x"], &[], &[1]);
        failed.error = Some("403".into());
        let items = plan(CleanupTarget::StalePullRequests, &[failed]);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_writes() {
        let transport = Arc::new(ScriptedTransport::new());
        let executor = CleanupExecutor::new(gateway(transport.clone()), 4).with_dry_run(true);
        let records = vec![record("widgets", &["old"], &["done"], &[3])];

        let branches = executor.delete_orphaned_branches(&records).await;
        let prs = executor.close_stale_prs(&records).await;

        assert_eq!(branches.len(), 2);
        assert_eq!(prs.len(), 1);
        assert!(branches.iter().chain(&prs).all(|o| o.status == OutcomeStatus::Planned));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let transport = Arc::new(ScriptedTransport::new());
        for name in ["a", "c", "d"] {
            transport.push(
                &format!("DELETE https://api.test/repos/acme/widgets/git/refs/heads/{name}"),
                status_response(204, ""),
            );
        }
        transport.push(
            "DELETE https://api.test/repos/acme/widgets/git/refs/heads/b",
            status_response(403, r#"{"message":"Resource not accessible by integration"}"#),
        );
        let executor = CleanupExecutor::new(gateway(transport.clone()), 2);
        let records = vec![record("widgets", &["a", "b", "c", "d"], &[], &[])];

        let outcomes = executor.delete_orphaned_branches(&records).await;

        assert_eq!(outcomes.len(), 4);
        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutcomeStatus::Deleted,
                OutcomeStatus::Failed,
                OutcomeStatus::Deleted,
                OutcomeStatus::Deleted
            ]
        );
        assert!(outcomes[1].error.as_deref().unwrap().contains("write access"));
        let summary = CleanupSummary::of(&outcomes);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_already_deleted_branch_counts_as_deleted() {
        let transport = Arc::new(ScriptedTransport::new());
        let executor = CleanupExecutor::new(gateway(transport), 1);
        let records = vec![record("widgets", &[], &["gone"], &[])];

        let outcomes = executor.delete_orphaned_branches(&records).await;
        assert_eq!(outcomes[0].status, OutcomeStatus::Deleted);
        assert!(outcomes[0].already_done);
    }

    #[tokio::test]
    async fn test_close_stale_prs() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            "PATCH https://api.test/repos/acme/widgets/pulls/41",
            json_response(r#"{"number":41,"state":"closed"}"#),
        );
        let executor = CleanupExecutor::new(gateway(transport), 4);
        let records = vec![record("widgets", &[], &[], &[41, 42])];

        let outcomes = executor.close_stale_prs(&records).await;
        assert_eq!(outcomes[0].status, OutcomeStatus::Closed);
        assert_eq!(outcomes[1].status, OutcomeStatus::Failed);
    }

    #[test]
    fn test_item_display() {
        let item = CleanupItem::ClosePullRequest {
            owner: "acme".into(),
            repo: "widgets".into(),
            number: 9,
        };
        assert_eq!(item.to_string(), "close PR acme/widgets#9");
    }
}
