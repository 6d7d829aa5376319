//! Console rendering of scan reports and cleanup results.

use crate::cleanup::{CleanupItem, CleanupOutcome, CleanupSummary, OutcomeStatus};
use crate::model::ScanReport;
use crate::ui::icons::{BRANCH, CHECK, CLOCK, CROSS, PULL_REQUEST, REPORT, TRASH, WARN};
use console::style;
use std::fmt::Write as _;

fn separator(out: &mut String) {
    let _ = writeln!(out, "{}", style("═".repeat(60)).cyan());
}

/// Repositories needing attention, then the totals.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();
    let stale_days = report.thresholds.stale_pr_days;

    for record in &report.records {
        if let Some(error) = &record.error {
            let _ = writeln!(out, "{}{} skipped: {}", CROSS, style(record.full_name()).red(), error);
            continue;
        }
        if !record.has_issues && record.pending_deletion.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}{}", WARN, style(record.full_name()).yellow().bold());
        let _ = writeln!(
            out,
            "   Branches: {} ({} orphaned, {} from closed/merged PRs)",
            record.total_branches,
            record.orphaned_branches.len(),
            record.pending_deletion.len()
        );
        let _ = writeln!(out, "   Open PRs: {}", record.open_pr_count);
        for pr in &record.stale_prs {
            let _ = writeln!(
                out,
                "   {}#{} {} by {} ({} days, over {})",
                CLOCK, pr.number, pr.title, pr.author, pr.days_old, stale_days
            );
        }
        for branch in &record.orphaned_branches {
            let _ = writeln!(out, "   {}{} by {} (no PR)", BRANCH, branch.name, branch.author);
        }
        for pending in &record.pending_deletion {
            let state = if pending.merged { "merged" } else { "closed" };
            let _ = writeln!(
                out,
                "   {}{} (PR #{} {} {} days ago)",
                PULL_REQUEST, pending.branch, pending.pr_number, state, pending.days_since_closed
            );
        }
        for outcome in &record.auto_deleted {
            let _ = writeln!(out, "   {}", render_outcome(outcome));
        }
        out.push('\n');
    }

    let s = &report.summary;
    separator(&mut out);
    let _ = writeln!(out, "{}SUMMARY: {}", REPORT, style(&report.target).bold());
    let _ = writeln!(out, "  Total repos: {}", s.total_repos);
    let _ = writeln!(
        out,
        "  Skipped: {} archived, {} inactive (>{} days)",
        s.archived_repos, s.inactive_repos, report.thresholds.inactive_days
    );
    let _ = writeln!(out, "  Active repos: {}", s.active_repos);
    if s.failed_repos > 0 {
        let _ = writeln!(out, "  Failed repos: {}", style(s.failed_repos).red());
    }
    let _ = writeln!(out, "  Repos with issues: {}", s.repos_with_issues);
    let _ = writeln!(out, "  Total open PRs: {}", s.total_open_prs);
    let _ = writeln!(out, "  Stale PRs (>{} days): {}", stale_days, s.stale_prs);
    let _ = writeln!(out, "  Orphaned branches: {}", s.orphaned_branches);
    let _ = writeln!(
        out,
        "  Branches with closed/merged PRs: {}",
        s.pending_deletion_branches
    );
    separator(&mut out);
    out
}

pub fn render_plan(items: &[CleanupItem]) -> String {
    if items.is_empty() {
        return format!("{}Nothing to clean up.\n", CHECK);
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "  {}{}", TRASH, item);
    }
    let _ = writeln!(out, "\n{} item(s) planned", style(items.len()).bold());
    out
}

fn render_outcome(outcome: &CleanupOutcome) -> String {
    match outcome.status {
        OutcomeStatus::Failed => format!(
            "{}{}: {}",
            CROSS,
            outcome.item,
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
        OutcomeStatus::Planned => format!("{}{} (dry run)", TRASH, outcome.item),
        OutcomeStatus::Deleted | OutcomeStatus::Closed if outcome.already_done => {
            format!("{}{} (already done)", CHECK, outcome.item)
        }
        OutcomeStatus::Deleted | OutcomeStatus::Closed => format!("{}{}", CHECK, outcome.item),
    }
}

pub fn render_outcomes(outcomes: &[CleanupOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        let _ = writeln!(out, "  {}", render_outcome(outcome));
    }
    let summary = CleanupSummary::of(outcomes);
    let _ = writeln!(
        out,
        "\n{} succeeded, {} planned, {} failed",
        style(summary.succeeded).green(),
        summary.planned,
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed)
        }
    );
    out
}
