//! Configuration view and validation commands: `orgscan config`.

use anyhow::Result;
use orgscan::config::{CONFIG_FILE_NAME, EnvOverrides, ScanToml};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let cwd = std::env::current_dir()?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("orgscan Configuration");
            println!("=====================");
            println!();

            let (toml, path) = ScanToml::discover(cli.config.as_deref(), &cwd)?;
            match &path {
                Some(path) => println!("Config file: {}", path.display()),
                None => {
                    println!("No {} found. Using default configuration.", CONFIG_FILE_NAME);
                    println!("Run 'orgscan config init' to create one.");
                }
            }
            println!();

            println!("[github]");
            println!("  api_url = \"{}\"", toml.github.api_url);
            println!("  timeout_secs = {}", toml.github.timeout_secs);
            println!("  max_pages = {}", toml.github.max_pages);
            println!();

            println!("[scan]");
            println!("  stale_pr_days = {}", toml.scan.stale_pr_days);
            println!("  inactive_days = {}", toml.scan.inactive_days);
            println!("  open_pr_warning_count = {}", toml.scan.open_pr_warning_count);
            println!("  concurrency = {}", toml.scan.concurrency);
            println!("  auto_delete = {}", toml.scan.auto_delete);
            println!();

            println!("[branches]");
            let exclusions = toml.branches.exclusions();
            println!(
                "  excluded = [{}]",
                exclusions.names().collect::<Vec<_>>().join(", ")
            );
            println!();

            println!("[retry]");
            println!("  max_attempts = {}", toml.retry.max_attempts);
            println!("  forbidden_retries = {}", toml.retry.forbidden_retries);
            println!("  forbidden_delay_secs = {}", toml.retry.forbidden_delay_secs);
            println!("  initial_backoff_ms = {}", toml.retry.initial_backoff_ms);
            println!("  max_backoff_secs = {}", toml.retry.max_backoff_secs);
            println!();

            // Environment values that override the file
            let env = EnvOverrides::from_env();
            println!("Environment:");
            println!(
                "  GITHUB_TOKEN = {}",
                if env.token.is_some() { "(set)" } else { "(not set)" }
            );
            println!("  GITHUB_ORG = {}", env.org.as_deref().unwrap_or("(not set)"));
            println!("  GITHUB_REPO = {}", env.repo.as_deref().unwrap_or("(not set)"));
            if let Some(days) = env.stale_pr_days {
                println!("  OLD_PR_THRESHOLD_DAYS = {}", days);
            }
            if let Some(auto_delete) = env.auto_delete {
                println!("  AUTO_DELETE = {}", auto_delete);
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let (toml, path) = ScanToml::discover(cli.config.as_deref(), &cwd)?;
            if path.is_none() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE_NAME);
                return Ok(());
            }

            let warnings = toml.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let config_path = cwd.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::write(&config_path, ScanToml::template())?;

            println!("Created {} at {}", CONFIG_FILE_NAME, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [scan] stale_pr_days, inactive_days, concurrency");
            println!("  - [branches] extra names that are never cleaned up");
            println!("  - [retry] attempts and delays for rate-limited calls");
            println!();
        }
    }

    Ok(())
}
