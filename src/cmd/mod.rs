//! CLI command implementations.
//!
//! | Module    | Commands handled                    |
//! |-----------|-------------------------------------|
//! | `scan`    | `Scan`                              |
//! | `cleanup` | `CleanupBranches`, `CleanupPrs`     |
//! | `config`  | `Config`                            |

pub mod cleanup;
pub mod config;
pub mod scan;

pub use cleanup::cmd_cleanup;
pub use config::cmd_config;
pub use scan::cmd_scan;

use anyhow::{Context, Result};
use console::style;
use orgscan::config::{CliOverrides, EnvOverrides, ScanConfig, ScanToml};
use orgscan::github::Gateway;
use orgscan::model::{ScanReport, ScanTarget};
use orgscan::scanner::{ScanOptions, Scanner, Silent};
use orgscan::ui::ScanProgress;
use orgscan::ui::icons::WARN;
use std::path::PathBuf;

use super::Cli;

/// Load orgscan.toml and layer the environment and flags on top.
pub(crate) fn resolve_config(cli: &Cli, auto_delete: bool) -> Result<(ScanConfig, Option<PathBuf>)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let (toml, path) = ScanToml::discover(cli.config.as_deref(), &cwd)?;
    for warning in toml.validate() {
        tracing::warn!(%warning, "configuration");
    }

    let cli_overrides = CliOverrides {
        org: cli.org.clone(),
        repo: cli.repo.clone(),
        stale_pr_days: cli.threshold_days,
        concurrency: cli.concurrency,
        auto_delete,
    };
    let config = ScanConfig::resolve(&toml, &EnvOverrides::from_env(), &cli_overrides)?;
    Ok((config, path))
}

pub(crate) fn connect(config: &ScanConfig) -> Result<Gateway> {
    if config.gateway.token.is_none() {
        eprintln!(
            "{}{}",
            WARN,
            style("No GITHUB_TOKEN provided. API rate limits will be restrictive (60 requests/hour).")
                .yellow()
        );
        eprintln!("   Provide a token for 5000 requests/hour.\n");
    }
    Gateway::connect(&config.gateway)
}

/// Run a scan, drawing progress on stderr when `progress` is set.
pub(crate) async fn run_scan(
    gateway: &Gateway,
    target: &ScanTarget,
    options: ScanOptions,
    progress: bool,
) -> Result<ScanReport> {
    let scanner = Scanner::new(gateway.clone(), options);
    let now = chrono::Utc::now();

    let report = if progress {
        let ui = ScanProgress::new();
        let result = scanner.scan(target, now, &ui).await;
        ui.finish();
        result?
    } else {
        scanner.scan(target, now, &Silent).await?
    };
    Ok(report)
}
