//! Repository enumeration.

use crate::errors::{GatewayError, ScanError};
use crate::github::Gateway;
use crate::model::{Repository, ScanTarget};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// Repositories of a target, partitioned for classification.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Every repository returned, archived and inactive included.
    pub total: usize,
    pub archived: usize,
    pub inactive: usize,
    /// Repositories selected for classification, in remote order.
    pub active: Vec<Repository>,
}

impl Enumeration {
    /// Partition `repos`: archived ones are dropped, ones with no activity
    /// since `cutoff` are dropped, the rest keep their order.
    pub fn partition(repos: Vec<Repository>, cutoff: DateTime<Utc>) -> Self {
        let total = repos.len();
        let mut archived = 0;
        let mut inactive = 0;
        let mut active = Vec::new();

        for repo in repos {
            if repo.archived {
                archived += 1;
            } else if !repo.active_since(cutoff) {
                debug!(repo = %repo.full_name(), "no recent activity, skipping classification");
                inactive += 1;
            } else {
                active.push(repo);
            }
        }

        Self {
            total,
            archived,
            inactive,
            active,
        }
    }
}

/// Lists the repositories of a scan target.
pub struct RepositoryEnumerator<'g> {
    gateway: &'g Gateway,
    inactive_days: i64,
}

impl<'g> RepositoryEnumerator<'g> {
    pub fn new(gateway: &'g Gateway, inactive_days: i64) -> Self {
        Self {
            gateway,
            inactive_days,
        }
    }

    /// Fetch and partition the target's repositories.
    ///
    /// Authentication failures are fatal here, since nothing can be scanned
    /// without the repository list.
    pub async fn enumerate(
        &self,
        target: &ScanTarget,
        now: DateTime<Utc>,
    ) -> Result<Enumeration, ScanError> {
        let repos = self.fetch(target).await?;
        let cutoff = now - Duration::days(self.inactive_days);
        let enumeration = Enumeration::partition(repos, cutoff);
        info!(
            target = %target,
            total = enumeration.total,
            archived = enumeration.archived,
            inactive = enumeration.inactive,
            active = enumeration.active.len(),
            "enumerated repositories"
        );
        Ok(enumeration)
    }

    async fn fetch(&self, target: &ScanTarget) -> Result<Vec<Repository>, ScanError> {
        let has_token = self.gateway.is_authenticated();
        match target {
            ScanTarget::Repository { owner, repo } => {
                match self.gateway.get_repo(owner, repo).await {
                    Ok(found) => Ok(vec![found]),
                    Err(GatewayError::NotFound { .. }) => Err(ScanError::RepositoryNotFound {
                        owner: owner.clone(),
                        repo: repo.clone(),
                    }),
                    Err(err) if err.is_auth() => Err(ScanError::authentication(err, has_token)),
                    Err(err) => Err(err.into()),
                }
            }
            ScanTarget::Organization { org } => match self.gateway.list_org_repos(org).await {
                Ok(repos) => Ok(repos),
                Err(GatewayError::NotFound { .. }) => {
                    warn!(%org, "no organization by that name, trying it as a user");
                    match self.gateway.list_user_repos(org).await {
                        Ok(repos) => Ok(repos),
                        Err(GatewayError::NotFound { .. }) => {
                            Err(ScanError::OrganizationNotFound { org: org.clone() })
                        }
                        Err(err) if err.is_auth() => {
                            Err(ScanError::authentication(err, has_token))
                        }
                        Err(err) => Err(err.into()),
                    }
                }
                Err(err) if err.is_auth() => Err(ScanError::authentication(err, has_token)),
                Err(err) => Err(err.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::testing::{ScriptedTransport, json_response, status_response};
    use crate::github::{GatewayConfig, RetryPolicy};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-30T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
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

    fn repo_json(name: &str, archived: bool, pushed_at: &str) -> String {
        format!(
            r#"{{"name":"{name}","owner":{{"login":"acme"}},"default_branch":"main","archived":{archived},"pushed_at":"{pushed_at}"}}"#
        )
    }

    #[test]
    fn test_partition_counts_archived_and_inactive() {
        let mk = |name: &str, archived: bool, days_ago: Option<i64>| Repository {
            owner: "acme".into(),
            name: name.into(),
            default_branch: "main".into(),
            archived,
            last_activity: days_ago.map(|d| now() - Duration::days(d)),
            html_url: String::new(),
        };
        let repos = vec![
            mk("a", false, Some(1)),
            mk("b", true, Some(1)),
            mk("c", false, Some(400)),
            mk("d", false, None),
            mk("e", false, Some(365)),
        ];
        let result = Enumeration::partition(repos, now() - Duration::days(365));
        assert_eq!(result.total, 5);
        assert_eq!(result.archived, 1);
        assert_eq!(result.inactive, 2);
        let names: Vec<_> = result.active.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "e"]);
    }

    #[test]
    fn test_partition_ninety_six_repos_with_twenty_four_archived() {
        let repos: Vec<Repository> = (0..96)
            .map(|i| Repository {
                owner: "acme".into(),
                name: format!("repo-{i}"),
                default_branch: "main".into(),
                archived: i % 4 == 0,
                last_activity: Some(now()),
                html_url: String::new(),
            })
            .collect();
        let result = Enumeration::partition(repos, now() - Duration::days(365));
        assert_eq!(result.total, 96);
        assert_eq!(result.archived, 24);
        assert_eq!(result.active.len(), 72);
        assert!(result.active.iter().all(|r| !r.archived));
    }

    #[tokio::test]
    async fn test_enumerate_organization() {
        let transport = Arc::new(ScriptedTransport::new());
        let body = format!(
            "[{},{}]",
            repo_json("live", false, "2025-06-01T00:00:00Z"),
            repo_json("old", true, "2020-01-01T00:00:00Z")
        );
        transport.push("GET https://api.test/orgs/acme/repos", json_response(&body));
        let gw = gateway(transport);

        let target = ScanTarget::Organization { org: "acme".into() };
        let result = RepositoryEnumerator::new(&gw, 365)
            .enumerate(&target, now())
            .await
            .unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.archived, 1);
        assert_eq!(result.active[0].name, "live");
    }

    #[tokio::test]
    async fn test_enumerate_falls_back_to_user_repos() {
        let transport = Arc::new(ScriptedTransport::new());
        let body = format!("[{}]", repo_json("dotfiles", false, "2025-06-01T00:00:00Z"));
        transport.push("GET https://api.test/users/octo/repos", json_response(&body));
        let gw = gateway(transport);

        let target = ScanTarget::Organization { org: "octo".into() };
        let result = RepositoryEnumerator::new(&gw, 365)
            .enumerate(&target, now())
            .await
            .unwrap();
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn test_enumerate_unknown_org_is_explicit() {
        let gw = gateway(Arc::new(ScriptedTransport::new()));
        let target = ScanTarget::Organization { org: "nobody".into() };
        let err = RepositoryEnumerator::new(&gw, 365)
            .enumerate(&target, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::OrganizationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_enumerate_single_repository_not_found() {
        let gw = gateway(Arc::new(ScriptedTransport::new()));
        let target = ScanTarget::Repository {
            owner: "acme".into(),
            repo: "ghost".into(),
        };
        let err = RepositoryEnumerator::new(&gw, 365)
            .enumerate(&target, now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("acme/ghost"));
    }

    #[tokio::test]
    async fn test_enumerate_auth_failure_is_fatal() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            "GET https://api.test/orgs/acme/repos",
            status_response(403, r#"{"message":"Must have admin rights"}"#),
        );
        let gw = gateway(transport.clone());
        let target = ScanTarget::Organization { org: "acme".into() };

        let err = RepositoryEnumerator::new(&gw, 365)
            .enumerate(&target, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Authentication { .. }));
        assert_eq!(transport.calls_to("GET https://api.test/orgs/acme/repos"), 2);
    }
}
