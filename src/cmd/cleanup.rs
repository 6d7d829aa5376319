//! Bulk cleanup: `orgscan cleanup-branches` and `orgscan cleanup-prs`.
//!
//! Both commands scan first, print the plan, then ask before writing.

use anyhow::Result;
use console::style;
use dialoguer::Confirm;
use orgscan::cleanup::{CleanupExecutor, CleanupSummary, CleanupTarget, plan};
use orgscan::scanner::ScanOptions;
use orgscan::ui::{render_outcomes, render_plan};

use super::super::Cli;

pub async fn cmd_cleanup(cli: &Cli, target: CleanupTarget, dry_run: bool) -> Result<()> {
    let (mut config, _) = super::resolve_config(cli, false)?;
    // Writes happen only after the plan is shown and confirmed.
    config.auto_delete = false;
    let gateway = super::connect(&config)?;

    let options = ScanOptions::from(&config).read_only();
    let report = super::run_scan(&gateway, &config.target, options, true).await?;
    if report.summary.failed_repos > 0 {
        eprintln!(
            "{} repositories could not be scanned and are left untouched",
            style(report.summary.failed_repos).yellow()
        );
    }

    let items = plan(target, &report.records);
    let action = match target {
        CleanupTarget::StalePullRequests => format!(
            "Stale pull requests (open more than {} days)",
            config.policy.stale_pr_days
        ),
        CleanupTarget::Branches | CleanupTarget::PendingDeletionBranches => {
            "Branches without an open pull request".to_string()
        }
    };

    println!();
    println!("{} in {}:", style(action).bold(), config.target);
    println!();
    if items.is_empty() {
        print!("{}", render_plan(&items));
        return Ok(());
    }

    let executor = CleanupExecutor::new(gateway, config.concurrency).with_dry_run(dry_run);
    if executor.is_dry_run() {
        let outcomes = executor.execute(items).await;
        println!();
        print!("{}", render_outcomes(&outcomes));
        println!("Dry run: nothing was changed.");
        return Ok(());
    }

    print!("{}", render_plan(&items));
    if !cli.yes {
        let confirm = Confirm::new()
            .with_prompt(format!("Apply {} change(s)? This cannot be undone", items.len()))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Aborted.");
            return Ok(());
        }
    }

    let outcomes = executor.execute(items).await;
    println!();
    print!("{}", render_outcomes(&outcomes));

    let summary = CleanupSummary::of(&outcomes);
    if summary.failed > 0 {
        anyhow::bail!("{} cleanup item(s) failed", summary.failed);
    }
    Ok(())
}
