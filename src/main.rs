use anyhow::Result;
use clap::{Parser, Subcommand};
use orgscan::logging::{LogFormat, init_logging};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "orgscan")]
#[command(
    version,
    about = "Find orphaned branches, leftover PR branches and stale pull requests across a GitHub organization"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Path to orgscan.toml (defaults to ./orgscan.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Organization or user to scan, or owner/repo for a single repository [env: GITHUB_ORG]
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Scan a single repository: a name inside --org, or owner/repo [env: GITHUB_REPO]
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// Open PRs older than this many days are stale [env: OLD_PR_THRESHOLD_DAYS]
    #[arg(long, global = true)]
    pub threshold_days: Option<i64>,

    /// Repositories processed in parallel
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan repositories and write a JSON health report
    Scan {
        /// Report path (defaults to ./reports/scan_<target>_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delete branches whose PR was closed or merged while scanning [env: AUTO_DELETE]
        #[arg(long)]
        auto_delete: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Delete orphaned branches and branches whose PR was closed or merged
    CleanupBranches {
        /// Show what would be deleted without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Close pull requests older than the stale threshold
    CleanupPrs {
        /// Show what would be closed without closing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default orgscan.toml to the working directory
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match &cli.command {
        Commands::Scan {
            output,
            auto_delete,
            no_progress,
        } => {
            cmd::cmd_scan(&cli, output.as_deref(), *auto_delete, !*no_progress).await?;
        }
        Commands::CleanupBranches { dry_run } => {
            cmd::cmd_cleanup(&cli, orgscan::cleanup::CleanupTarget::Branches, *dry_run).await?;
        }
        Commands::CleanupPrs { dry_run } => {
            cmd::cmd_cleanup(&cli, orgscan::cleanup::CleanupTarget::StalePullRequests, *dry_run)
                .await?;
        }
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
