//! Configuration for orgscan.
//!
//! Settings are layered: `orgscan.toml` → environment → CLI flags. The result
//! is a resolved [`ScanConfig`] that the scanner and the cleanup executor take
//! as plain input.
//!
//! # Configuration File Format
//!
//! ```toml
//! [github]
//! api_url = "https://api.github.com"
//! timeout_secs = 30
//! max_pages = 1000
//!
//! [scan]
//! stale_pr_days = 30
//! inactive_days = 365
//! open_pr_warning_count = 3
//! concurrency = 4
//! auto_delete = false
//!
//! [branches]
//! # Replaces the built-in standard set when present
//! standard = ["main", "develop"]
//! # Added to the standard set
//! extra = ["gh-pages"]
//!
//! [retry]
//! max_attempts = 3
//! forbidden_retries = 1
//! forbidden_delay_secs = 5
//! initial_backoff_ms = 500
//! max_backoff_secs = 30
//! ```

use crate::classifier::{BranchExclusions, ClassifyPolicy, STANDARD_BRANCHES};
use crate::errors::ScanError;
use crate::github::{DEFAULT_API_URL, GatewayConfig, RetryPolicy};
use crate::model::ScanTarget;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "orgscan.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on pages followed for one listing
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> usize {
    1000
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    /// Open PRs older than this many days are stale
    #[serde(default = "default_stale_pr_days")]
    pub stale_pr_days: i64,
    /// Repositories without a push for this many days are not classified
    #[serde(default = "default_inactive_days")]
    pub inactive_days: i64,
    /// More open PRs than this flags the repository
    #[serde(default = "default_open_pr_warning_count")]
    pub open_pr_warning_count: usize,
    /// Repositories classified in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Delete closed/merged-PR branches while scanning
    #[serde(default)]
    pub auto_delete: bool,
}

fn default_stale_pr_days() -> i64 {
    30
}

fn default_inactive_days() -> i64 {
    365
}

fn default_open_pr_warning_count() -> usize {
    3
}

fn default_concurrency() -> usize {
    4
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            stale_pr_days: default_stale_pr_days(),
            inactive_days: default_inactive_days(),
            open_pr_warning_count: default_open_pr_warning_count(),
            concurrency: default_concurrency(),
            auto_delete: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchesSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<Vec<String>>,
    #[serde(default)]
    pub extra: Vec<String>,
}

impl BranchesSection {
    pub fn exclusions(&self) -> BranchExclusions {
        let base = match &self.standard {
            Some(names) => BranchExclusions::new(names.iter().cloned()),
            None => BranchExclusions::default(),
        };
        base.with_extra(self.extra.iter().cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_forbidden_retries")]
    pub forbidden_retries: u32,
    #[serde(default = "default_forbidden_delay_secs")]
    pub forbidden_delay_secs: u64,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_forbidden_retries() -> u32 {
    1
}

fn default_forbidden_delay_secs() -> u64 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_secs() -> u64 {
    30
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            forbidden_retries: default_forbidden_retries(),
            forbidden_delay_secs: default_forbidden_delay_secs(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            forbidden_retries: self.forbidden_retries,
            forbidden_delay: Duration::from_secs(self.forbidden_delay_secs),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }
}

/// The complete orgscan.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanToml {
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub branches: BranchesSection,
    #[serde(default)]
    pub retry: RetrySection,
}

impl ScanToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse orgscan.toml")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize orgscan.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Candidate locations, most specific first.
    pub fn search_paths(explicit: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }
        let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("orgscan").join("config.toml"));
        }
        paths
    }

    /// Load the first config file found, or defaults when there is none.
    /// An explicitly named file must exist.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit
            && !path.exists()
        {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        for path in Self::search_paths(explicit, cwd) {
            if path.exists() {
                let toml = Self::load(&path)?;
                return Ok((toml, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.scan.concurrency == 0 {
            warnings.push("scan.concurrency is 0; 1 worker will be used".to_string());
        }
        if self.scan.stale_pr_days < 0 {
            warnings.push(format!(
                "scan.stale_pr_days is negative ({}); every open PR will be stale",
                self.scan.stale_pr_days
            ));
        }
        if self.scan.inactive_days <= 0 {
            warnings.push(format!(
                "scan.inactive_days is {}; only repositories pushed in the future count as active",
                self.scan.inactive_days
            ));
        }
        if self.retry.max_attempts == 0 {
            warnings.push("retry.max_attempts is 0; each call is attempted once".to_string());
        }
        if self.github.timeout_secs == 0 {
            warnings.push("github.timeout_secs is 0; every request will time out".to_string());
        }
        if let Some(standard) = &self.branches.standard
            && standard.is_empty()
        {
            warnings.push(
                "branches.standard is empty; only default and protected branches are excluded"
                    .to_string(),
            );
        }
        if !self.github.api_url.starts_with("https://") && !self.github.api_url.starts_with("http://")
        {
            warnings.push(format!(
                "github.api_url '{}' is not an http(s) URL",
                self.github.api_url
            ));
        }
        warnings
    }

    /// A commented starting point for `orgscan config init`.
    pub fn template() -> String {
        let standard = STANDARD_BRANCHES
            .iter()
            .map(|n| format!("\"{}\"", n))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"# orgscan configuration

[github]
api_url = "{api}"
timeout_secs = {timeout}
max_pages = {pages}

[scan]
stale_pr_days = {stale}
inactive_days = {inactive}
open_pr_warning_count = {warn}
concurrency = {conc}
auto_delete = false

[branches]
# Uncomment to replace the built-in list of long-lived branch names.
# standard = [{standard}]
extra = []

[retry]
max_attempts = {attempts}
forbidden_retries = {forbidden}
forbidden_delay_secs = {forbidden_delay}
initial_backoff_ms = {backoff}
max_backoff_secs = {max_backoff}
"#,
            api = default_api_url(),
            timeout = default_timeout_secs(),
            pages = default_max_pages(),
            stale = default_stale_pr_days(),
            inactive = default_inactive_days(),
            warn = default_open_pr_warning_count(),
            conc = default_concurrency(),
            attempts = default_max_attempts(),
            forbidden = default_forbidden_retries(),
            forbidden_delay = default_forbidden_delay_secs(),
            backoff = default_initial_backoff_ms(),
            max_backoff = default_max_backoff_secs(),
        )
    }
}

/// Values read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub token: Option<String>,
    pub org: Option<String>,
    pub repo: Option<String>,
    pub stale_pr_days: Option<i64>,
    pub auto_delete: Option<bool>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            token: non_empty("GITHUB_TOKEN"),
            org: non_empty("GITHUB_ORG"),
            repo: non_empty("GITHUB_REPO"),
            stale_pr_days: non_empty("OLD_PR_THRESHOLD_DAYS").and_then(|v| v.trim().parse().ok()),
            auto_delete: non_empty("AUTO_DELETE").map(|v| parse_flag(&v)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub org: Option<String>,
    pub repo: Option<String>,
    pub stale_pr_days: Option<i64>,
    pub concurrency: Option<usize>,
    pub auto_delete: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: ScanTarget,
    pub gateway: GatewayConfig,
    pub policy: ClassifyPolicy,
    pub inactive_days: i64,
    pub concurrency: usize,
    pub auto_delete: bool,
}

impl ScanConfig {
    pub fn resolve(
        toml: &ScanToml,
        env: &EnvOverrides,
        cli: &CliOverrides,
    ) -> Result<Self, ScanError> {
        let target = resolve_target(
            cli.org.as_deref().or(env.org.as_deref()),
            cli.repo.as_deref().or(env.repo.as_deref()),
        )?;

        let stale_pr_days = cli
            .stale_pr_days
            .or(env.stale_pr_days)
            .unwrap_or(toml.scan.stale_pr_days);

        Ok(Self {
            target,
            gateway: GatewayConfig {
                api_url: toml.github.api_url.clone(),
                token: env.token.clone(),
                timeout: Duration::from_secs(toml.github.timeout_secs),
                retry: toml.retry.policy(),
                max_pages: toml.github.max_pages,
            },
            policy: ClassifyPolicy {
                stale_pr_days,
                open_pr_warning_count: toml.scan.open_pr_warning_count,
                exclusions: toml.branches.exclusions(),
            },
            inactive_days: toml.scan.inactive_days,
            concurrency: cli.concurrency.unwrap_or(toml.scan.concurrency).max(1),
            auto_delete: cli.auto_delete || env.auto_delete.unwrap_or(toml.scan.auto_delete),
        })
    }
}

/// `repo` may be a bare name (combined with `org`) or `owner/repo`.
fn resolve_target(org: Option<&str>, repo: Option<&str>) -> Result<ScanTarget, ScanError> {
    match (org, repo) {
        (_, Some(repo)) if repo.contains('/') => {
            ScanTarget::parse(repo).ok_or_else(|| ScanError::InvalidTarget(repo.to_string()))
        }
        (Some(org), Some(repo)) => {
            let joined = format!("{}/{}", org.trim(), repo.trim());
            ScanTarget::parse(&joined).ok_or(ScanError::InvalidTarget(joined))
        }
        (Some(org), None) => {
            ScanTarget::parse(org).ok_or_else(|| ScanError::InvalidTarget(org.to_string()))
        }
        (None, Some(_)) | (None, None) => Err(ScanError::MissingTarget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let toml = ScanToml::parse("").unwrap();
        assert_eq!(toml.scan.stale_pr_days, 30);
        assert_eq!(toml.scan.inactive_days, 365);
        assert_eq!(toml.scan.concurrency, 4);
        assert!(!toml.scan.auto_delete);
        assert_eq!(toml.retry.forbidden_retries, 1);
        assert_eq!(toml.github.api_url, "https://api.github.com");
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let toml = ScanToml::parse(
            r#"
            [scan]
            stale_pr_days = 14

            [branches]
            extra = ["gh-pages"]

            [retry]
            forbidden_retries = 2
            forbidden_delay_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(toml.scan.stale_pr_days, 14);
        assert_eq!(toml.scan.concurrency, 4);
        let exclusions = toml.branches.exclusions();
        assert!(exclusions.contains("gh-pages"));
        assert!(exclusions.contains("main"));
        let policy = toml.retry.policy();
        assert_eq!(policy.forbidden_retries, 2);
        assert_eq!(policy.forbidden_delay, Duration::ZERO);
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn test_standard_list_replaces_default() {
        let toml = ScanToml::parse("[branches]\nstandard = [\"trunk\"]\n").unwrap();
        let exclusions = toml.branches.exclusions();
        assert!(exclusions.contains("trunk"));
        assert!(!exclusions.contains("develop"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(ScanToml::parse("[scan\nstale_pr_days = ").is_err());
    }

    #[test]
    fn test_validate_reports_warnings() {
        let mut toml = ScanToml::default();
        toml.scan.concurrency = 0;
        toml.retry.max_attempts = 0;
        toml.branches.standard = Some(Vec::new());
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("concurrency")));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let toml = ScanToml::parse(&ScanToml::template()).unwrap();
        assert_eq!(toml.scan.stale_pr_days, 30);
        assert!(toml.branches.standard.is_none());
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut toml = ScanToml::default();
        toml.scan.stale_pr_days = 60;
        toml.save(&path).unwrap();
        let loaded = ScanToml::load(&path).unwrap();
        assert_eq!(loaded.scan.stale_pr_days, 60);
    }

    #[test]
    fn test_discover_prefers_working_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[scan]\nconcurrency = 9\n").unwrap();
        let (toml, path) = ScanToml::discover(None, dir.path()).unwrap();
        assert_eq!(toml.scan.concurrency, 9);
        assert_eq!(path.unwrap(), dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_discover_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ScanToml::discover(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_env_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GITHUB_TOKEN", "ghp_abc"),
            ("GITHUB_ORG", "acme"),
            ("GITHUB_REPO", ""),
            ("OLD_PR_THRESHOLD_DAYS", "45"),
            ("AUTO_DELETE", "TRUE"),
        ]);
        let env = EnvOverrides::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(env.token.as_deref(), Some("ghp_abc"));
        assert_eq!(env.org.as_deref(), Some("acme"));
        assert_eq!(env.repo, None);
        assert_eq!(env.stale_pr_days, Some(45));
        assert_eq!(env.auto_delete, Some(true));
    }

    #[test]
    fn test_resolve_layers_cli_over_env_over_file() {
        let mut toml = ScanToml::default();
        toml.scan.stale_pr_days = 10;
        toml.scan.concurrency = 2;
        let env = EnvOverrides {
            org: Some("env-org".into()),
            stale_pr_days: Some(20),
            ..Default::default()
        };
        let cli = CliOverrides {
            org: Some("cli-org".into()),
            stale_pr_days: Some(40),
            ..Default::default()
        };

        let config = ScanConfig::resolve(&toml, &env, &cli).unwrap();
        assert_eq!(config.target, ScanTarget::Organization { org: "cli-org".into() });
        assert_eq!(config.policy.stale_pr_days, 40);
        assert_eq!(config.concurrency, 2);

        let config = ScanConfig::resolve(&toml, &env, &CliOverrides::default()).unwrap();
        assert_eq!(config.policy.stale_pr_days, 20);
        assert_eq!(config.gateway.token, None);
    }

    #[test]
    fn test_resolve_single_repo_targets() {
        let toml = ScanToml::default();
        let env = EnvOverrides {
            org: Some("acme".into()),
            repo: Some("widgets".into()),
            ..Default::default()
        };
        let config = ScanConfig::resolve(&toml, &env, &CliOverrides::default()).unwrap();
        assert_eq!(config.target.to_string(), "acme/widgets");

        let cli = CliOverrides {
            repo: Some("other/gadgets".into()),
            ..Default::default()
        };
        let config = ScanConfig::resolve(&toml, &EnvOverrides::default(), &cli).unwrap();
        assert_eq!(config.target.to_string(), "other/gadgets");
    }

    #[test]
    fn test_resolve_without_target_fails() {
        let err = ScanConfig::resolve(
            &ScanToml::default(),
            &EnvOverrides::default(),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::MissingTarget));
    }

    #[test]
    fn test_resolve_auto_delete_sources() {
        let toml = ScanToml::default();
        let env = EnvOverrides {
            org: Some("acme".into()),
            auto_delete: Some(true),
            ..Default::default()
        };
        let config = ScanConfig::resolve(&toml, &env, &CliOverrides::default()).unwrap();
        assert!(config.auto_delete);

        let cli = CliOverrides {
            org: Some("acme".into()),
            auto_delete: true,
            ..Default::default()
        };
        let config = ScanConfig::resolve(&toml, &EnvOverrides::default(), &cli).unwrap();
        assert!(config.auto_delete);
    }
}
