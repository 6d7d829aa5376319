//! Scan orchestration: enumerate → classify (bounded parallel) → report.

use crate::classifier::{ClassifyPolicy, fetch_and_classify};
use crate::cleanup::{CleanupExecutor, CleanupTarget};
use crate::config::ScanConfig;
use crate::enumerator::{Enumeration, RepositoryEnumerator};
use crate::errors::ScanError;
use crate::github::Gateway;
use crate::model::{HealthRecord, Repository, ScanReport, ScanTarget, Thresholds};
use crate::report::ReportBuilder;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::slice;
use tracing::info;

/// Receives scan progress. Every method has a no-op default.
pub trait ScanObserver: Send + Sync {
    fn enumerated(&self, _enumeration: &Enumeration) {}
    fn repository_started(&self, _repo: &Repository) {}
    fn repository_finished(&self, _record: &HealthRecord) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl ScanObserver for Silent {}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub policy: ClassifyPolicy,
    pub inactive_days: i64,
    pub concurrency: usize,
    pub auto_delete: bool,
}

impl ScanOptions {
    /// The same options with inline deletion switched off, whatever the
    /// configuration says. Scans that feed a cleanup plan use this.
    pub fn read_only(self) -> Self {
        Self {
            auto_delete: false,
            ..self
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            stale_pr_days: self.policy.stale_pr_days,
            inactive_days: self.inactive_days,
            open_pr_warning_count: self.policy.open_pr_warning_count,
        }
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            policy: config.policy.clone(),
            inactive_days: config.inactive_days,
            concurrency: config.concurrency,
            auto_delete: config.auto_delete,
        }
    }
}

pub struct Scanner {
    gateway: Gateway,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(gateway: Gateway, options: ScanOptions) -> Self {
        Self { gateway, options }
    }

    /// Scan `target` as of `now`.
    ///
    /// Only enumeration failures are fatal. A repository that cannot be read
    /// still appears in the report, carrying its error marker.
    pub async fn scan(
        &self,
        target: &ScanTarget,
        now: DateTime<Utc>,
        observer: &dyn ScanObserver,
    ) -> Result<ScanReport, ScanError> {
        let enumeration = RepositoryEnumerator::new(&self.gateway, self.options.inactive_days)
            .enumerate(target, now)
            .await?;
        observer.enumerated(&enumeration);

        let records = self.classify_all(&enumeration.active, now, observer).await;

        let mut builder = ReportBuilder::new(target.clone(), now, self.options.thresholds())
            .with_enumeration(&enumeration);
        builder.extend(records);
        let report = builder.build();

        info!(
            target = %target,
            active = report.summary.active_repos,
            failed = report.summary.failed_repos,
            with_issues = report.summary.repos_with_issues,
            "scan complete"
        );
        Ok(report)
    }

    /// Classify repositories with at most `concurrency` in flight.
    /// Records come back in the order of `repos`.
    async fn classify_all(
        &self,
        repos: &[Repository],
        now: DateTime<Utc>,
        observer: &dyn ScanObserver,
    ) -> Vec<HealthRecord> {
        let cleaner = self
            .options
            .auto_delete
            .then(|| CleanupExecutor::new(self.gateway.clone(), 1));

        stream::iter(repos)
            .map(|repo| {
                let cleaner = cleaner.as_ref();
                async move {
                    observer.repository_started(repo);
                    let mut record =
                        fetch_and_classify(&self.gateway, repo, now, &self.options.policy).await;
                    if let Some(cleaner) = cleaner
                        && !record.is_error()
                        && !record.pending_deletion.is_empty()
                    {
                        record.auto_deleted = cleaner
                            .run(
                                CleanupTarget::PendingDeletionBranches,
                                slice::from_ref(&record),
                            )
                            .await;
                    }
                    observer.repository_finished(&record);
                    record
                }
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::OutcomeStatus;
    use crate::github::testing::{ScriptedTransport, json_response, status_response};
    use crate::github::{GatewayConfig, RetryPolicy};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const API: &str = "https://api.test";

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-30T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn gateway(transport: Arc<ScriptedTransport>) -> Gateway {
        Gateway::with_transport(
            transport,
            &GatewayConfig {
                api_url: API.into(),
                token: Some("ghp_test".into()),
                retry: RetryPolicy::immediate(),
                ..Default::default()
            },
        )
    }

    fn options(auto_delete: bool) -> ScanOptions {
        ScanOptions {
            policy: ClassifyPolicy::default(),
            inactive_days: 365,
            concurrency: 3,
            auto_delete,
        }
    }

    fn repo_json(name: &str) -> String {
        format!(
            r#"{{"name":"{name}","owner":{{"login":"acme"}},"default_branch":"main","archived":false,"pushed_at":"2025-06-01T00:00:00Z"}}"#
        )
    }

    fn script_repo(transport: &ScriptedTransport, name: &str, branches: &str, pulls: &str) {
        transport.push(
            &format!("GET {API}/repos/acme/{name}/branches"),
            json_response(branches),
        );
        transport.push(
            &format!("GET {API}/repos/acme/{name}/pulls"),
            json_response(pulls),
        );
    }

    const MERGED_FEATURE: &str = r#"[{"number":7,"state":"closed","created_at":"2025-05-01T00:00:00Z","closed_at":"2025-06-20T00:00:00Z","merged_at":"2025-06-20T00:00:00Z","user":{"login":"dev"},"head":{"ref":"feature-x"}}]"#;

    #[derive(Default)]
    struct Counting {
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    impl ScanObserver for Counting {
        fn repository_started(&self, _repo: &Repository) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn repository_finished(&self, _record: &HealthRecord) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_forbidden_repository_is_skipped_and_others_complete() {
        let transport = Arc::new(ScriptedTransport::new());
        let repos = format!(
            "[{},{},{}]",
            repo_json("alpha"),
            repo_json("blocked"),
            repo_json("gamma")
        );
        transport.push(&format!("GET {API}/orgs/acme/repos"), json_response(&repos));
        script_repo(&transport, "alpha", r#"[{"name":"main"},{"name":"spike"}]"#, "[]");
        transport.push(
            &format!("GET {API}/repos/acme/blocked/branches"),
            status_response(403, r#"{"message":"Resource not accessible by integration"}"#),
        );
        script_repo(&transport, "gamma", r#"[{"name":"main"}]"#, "[]");

        let observer = Counting::default();
        let scanner = Scanner::new(gateway(transport.clone()), options(false));
        let report = scanner
            .scan(&ScanTarget::Organization { org: "acme".into() }, now(), &observer)
            .await
            .unwrap();

        let names: Vec<_> = report.records.iter().map(|r| r.repository.as_str()).collect();
        assert_eq!(names, vec!["alpha", "blocked", "gamma"]);
        assert!(report.records[1].is_error());
        assert_eq!(report.records[0].orphaned_branches[0].name, "spike");
        assert_eq!(report.summary.failed_repos, 1);
        assert_eq!(report.summary.orphaned_branches, 1);
        assert_eq!(
            transport.calls_to(&format!("GET {API}/repos/acme/blocked/branches")),
            2
        );
        assert_eq!(observer.started.load(Ordering::SeqCst), 3);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_auto_delete_removes_pending_branches_inline() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            &format!("GET {API}/repos/acme/widgets"),
            json_response(&repo_json("widgets")),
        );
        script_repo(
            &transport,
            "widgets",
            r#"[{"name":"main"},{"name":"feature-x"},{"name":"spike"}]"#,
            MERGED_FEATURE,
        );
        transport.push(
            &format!("DELETE {API}/repos/acme/widgets/git/refs/heads/feature-x"),
            status_response(204, ""),
        );

        let target = ScanTarget::Repository {
            owner: "acme".into(),
            repo: "widgets".into(),
        };
        let report = Scanner::new(gateway(transport.clone()), options(true))
            .scan(&target, now(), &Silent)
            .await
            .unwrap();

        let record = &report.records[0];
        assert_eq!(record.pending_deletion.len(), 1);
        assert_eq!(record.auto_deleted.len(), 1);
        assert_eq!(record.auto_deleted[0].status, OutcomeStatus::Deleted);
        // orphaned branches are never deleted during a scan
        assert_eq!(
            transport.calls_to(&format!("DELETE {API}/repos/acme/widgets/git/refs/heads/spike")),
            0
        );
    }

    #[tokio::test]
    async fn test_read_only_scan_ignores_configured_auto_delete() {
        use crate::config::{CliOverrides, EnvOverrides, ScanToml};

        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            &format!("GET {API}/repos/acme/widgets"),
            json_response(&repo_json("widgets")),
        );
        script_repo(
            &transport,
            "widgets",
            r#"[{"name":"main"},{"name":"feature-x"}]"#,
            MERGED_FEATURE,
        );

        let toml = ScanToml::parse("[scan]\nauto_delete = true\n").unwrap();
        let env = EnvOverrides {
            repo: Some("acme/widgets".into()),
            auto_delete: Some(true),
            ..Default::default()
        };
        let config = ScanConfig::resolve(&toml, &env, &CliOverrides::default()).unwrap();
        assert!(config.auto_delete);

        let options = ScanOptions::from(&config).read_only();
        assert!(!options.auto_delete);
        let report = Scanner::new(gateway(transport.clone()), options)
            .scan(&config.target, now(), &Silent)
            .await
            .unwrap();

        assert_eq!(report.summary.pending_deletion_branches, 1);
        assert!(report.records[0].auto_deleted.is_empty());
        assert!(transport.calls().iter().all(|c| c.starts_with("GET ")));
    }

    #[tokio::test]
    async fn test_scan_without_auto_delete_issues_no_writes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            &format!("GET {API}/repos/acme/widgets"),
            json_response(&repo_json("widgets")),
        );
        script_repo(
            &transport,
            "widgets",
            r#"[{"name":"main"},{"name":"feature-x"}]"#,
            MERGED_FEATURE,
        );

        let target = ScanTarget::Repository {
            owner: "acme".into(),
            repo: "widgets".into(),
        };
        let report = Scanner::new(gateway(transport.clone()), options(false))
            .scan(&target, now(), &Silent)
            .await
            .unwrap();

        assert_eq!(report.summary.pending_deletion_branches, 1);
        assert!(report.records[0].auto_deleted.is_empty());
        assert!(transport.calls().iter().all(|c| c.starts_with("GET ")));
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            &format!("GET {API}/orgs/acme/repos"),
            status_response(401, r#"{"message":"Bad credentials"}"#),
        );
        let err = Scanner::new(gateway(transport), options(false))
            .scan(&ScanTarget::Organization { org: "acme".into() }, now(), &Silent)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Authentication { .. }));
    }
}
