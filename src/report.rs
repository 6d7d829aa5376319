//! Report assembly.
//!
//! The builder only aggregates; rendering to text, JSON files or Markdown is
//! left to whoever consumes the finished [`ScanReport`].

use crate::enumerator::Enumeration;
use crate::model::{HealthRecord, ScanReport, ScanSummary, ScanTarget, Thresholds};
use chrono::{DateTime, Utc};

pub struct ReportBuilder {
    target: ScanTarget,
    generated_at: DateTime<Utc>,
    thresholds: Thresholds,
    total_repos: usize,
    archived_repos: usize,
    inactive_repos: usize,
    records: Vec<HealthRecord>,
}

impl ReportBuilder {
    pub fn new(target: ScanTarget, generated_at: DateTime<Utc>, thresholds: Thresholds) -> Self {
        Self {
            target,
            generated_at,
            thresholds,
            total_repos: 0,
            archived_repos: 0,
            inactive_repos: 0,
            records: Vec::new(),
        }
    }

    /// Take the repository counts from an enumeration.
    pub fn with_enumeration(mut self, enumeration: &Enumeration) -> Self {
        self.total_repos = enumeration.total;
        self.archived_repos = enumeration.archived;
        self.inactive_repos = enumeration.inactive;
        self
    }

    pub fn push(&mut self, record: HealthRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = HealthRecord>) {
        self.records.extend(records);
    }

    /// Compute the summary and freeze the report.
    ///
    /// Records with an error marker count as active and failed, but add
    /// nothing to the health totals.
    pub fn build(self) -> ScanReport {
        let summary = summarize(
            &self.records,
            self.total_repos,
            self.archived_repos,
            self.inactive_repos,
        );
        ScanReport {
            target: self.target,
            generated_at: self.generated_at,
            thresholds: self.thresholds,
            summary,
            records: self.records,
        }
    }
}

fn summarize(
    records: &[HealthRecord],
    total_repos: usize,
    archived_repos: usize,
    inactive_repos: usize,
) -> ScanSummary {
    let mut summary = ScanSummary {
        total_repos,
        archived_repos,
        inactive_repos,
        active_repos: records.len(),
        ..Default::default()
    };
    for record in records {
        if record.is_error() {
            summary.failed_repos += 1;
            continue;
        }
        if record.has_issues {
            summary.repos_with_issues += 1;
        }
        summary.total_open_prs += record.open_pr_count;
        summary.stale_prs += record.stale_prs.len();
        summary.orphaned_branches += record.orphaned_branches.len();
        summary.pending_deletion_branches += record.pending_deletion.len();
    }
    summary
}
