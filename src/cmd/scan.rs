//! Repository scan: `orgscan scan`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use orgscan::model::{ScanReport, ScanTarget};
use orgscan::scanner::ScanOptions;
use orgscan::ui::icons::FILE_NEW;
use orgscan::ui::render_report;
use std::path::{Path, PathBuf};

use super::super::Cli;

pub async fn cmd_scan(
    cli: &Cli,
    output: Option<&Path>,
    auto_delete: bool,
    progress: bool,
) -> Result<()> {
    let (config, _) = super::resolve_config(cli, auto_delete)?;
    let gateway = super::connect(&config)?;

    println!();
    println!("Scanning {}", config.target);
    println!();

    let report = super::run_scan(&gateway, &config.target, ScanOptions::from(&config), progress).await?;
    print!("{}", render_report(&report));

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => default_report_path(&config.target, report.generated_at),
    };
    write_report(&report, &path)?;
    println!("{}Full report saved: {}", FILE_NEW, path.display());
    Ok(())
}

/// `reports/scan_<owner>[_<repo>]_<YYYYmmdd_HHMMSS>.json`
fn default_report_path(target: &ScanTarget, at: DateTime<Utc>) -> PathBuf {
    let stem = match target {
        ScanTarget::Organization { org } => org.clone(),
        ScanTarget::Repository { owner, repo } => format!("{}_{}", owner, repo),
    };
    PathBuf::from("reports").join(format!(
        "scan_{}_{}.json",
        stem,
        at.format("%Y%m%d_%H%M%S")
    ))
}

fn write_report(report: &ScanReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    json.push('\n');
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))
}
