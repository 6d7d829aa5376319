//! Retrying, rate-limit-aware access to the GitHub REST API.

use super::pagination::Pages;
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use super::transport::{ApiRequest, ApiResponse, HttpMethod, ReqwestTransport, Transport};
use super::wire::{WireBranch, WireCommit, WirePullRequest, WireRepository};
use crate::errors::GatewayError;
use crate::model::{Branch, PullRequest, Repository};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;

/// Connection settings for a [`Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub max_pages: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_pages: 1000,
        }
    }
}

/// Outcome of an idempotent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationResult {
    /// The write changed remote state.
    Applied,
    /// The remote was already in the requested state.
    AlreadyDone,
}

/// Shared handle to the remote. Cloning is cheap; every clone shares the same
/// transport and the same rate-limit state.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    base_url: String,
    max_pages: usize,
    authenticated: bool,
}

impl Gateway {
    /// Build a gateway over the real HTTP transport.
    pub fn connect(config: &GatewayConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(config.token.as_deref(), config.timeout)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: &GatewayConfig) -> Self {
        Self {
            transport,
            rate_limiter: Arc::new(RateLimiter::new()),
            retry: config.retry.clone(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            max_pages: config.max_pages.max(1),
            authenticated: config.token.is_some(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The API path of a URL, for diagnostics.
    pub(crate) fn endpoint_of(&self, url: &str) -> String {
        let path = url.strip_prefix(&self.base_url).unwrap_or(url);
        path.split('?').next().unwrap_or(path).to_string()
    }

    /// Lazy paginated GET over `path` with extra query parameters.
    pub fn paged_get(&self, path: &str, params: &[(&str, &str)]) -> Pages<'_> {
        let mut request = ApiRequest::get(self.url(path)).with_query("per_page", PER_PAGE);
        for (key, value) in params {
            request = request.with_query(key, value);
        }
        Pages::new(self, request, self.max_pages)
    }

    /// Single-object GET.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let request = ApiRequest::get(self.url(path));
        let response = self.execute(&request).await?;
        serde_json::from_str(&response.body).map_err(|e| GatewayError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Issue one request, applying the rate limiter and the retry policy.
    pub(crate) async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let endpoint = self.endpoint_of(&request.url);
        let mut transient_failures = 0u32;
        let mut forbidden_seen = 0u32;

        loop {
            self.rate_limiter.acquire().await;
            debug!(method = ?request.method, %endpoint, "GitHub request");

            let last_error = match self.transport.send(request).await {
                Err(err) => err.to_string(),
                Ok(response) => {
                    self.rate_limiter.observe(&response.meta).await;
                    match response.status {
                        200..=299 => return Ok(response),
                        401 => return Err(GatewayError::Unauthorized { endpoint }),
                        403 | 429 => {
                            forbidden_seen += 1;
                            let message = response.error_message();
                            if !self.retry.allows_forbidden(forbidden_seen) {
                                return Err(GatewayError::Forbidden { endpoint, message });
                            }
                            let delay = response
                                .meta
                                .retry_after
                                .map(Duration::from_secs)
                                .unwrap_or_default()
                                .max(self.retry.forbidden_delay);
                            warn!(
                                %endpoint,
                                status = response.status,
                                %message,
                                delay_secs = delay.as_secs(),
                                "request refused, retrying once the delay passes"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        404 => return Err(GatewayError::NotFound { endpoint }),
                        status if status >= 500 => {
                            format!("HTTP {}: {}", status, response.error_message())
                        }
                        status => {
                            return Err(GatewayError::Validation {
                                endpoint,
                                status,
                                message: response.error_message(),
                            });
                        }
                    }
                }
            };

            transient_failures += 1;
            if !self.retry.allows_transient(transient_failures) {
                return Err(GatewayError::RetriesExhausted {
                    endpoint,
                    attempts: transient_failures,
                    last_error,
                });
            }
            let delay = self.retry.backoff_for(transient_failures);
            warn!(
                %endpoint,
                attempt = transient_failures,
                error = %last_error,
                delay_ms = delay.as_millis() as u64,
                "transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    // ── reads ────────────────────────────────────────────────────────

    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>, GatewayError> {
        let path = format!("/orgs/{}/repos", encode_segment(org));
        let wire: Vec<WireRepository> = self.paged_get(&path, &[("type", "all")]).collect_all().await?;
        Ok(wire.into_iter().map(|r| r.into_repository(org)).collect())
    }

    pub async fn list_user_repos(&self, user: &str) -> Result<Vec<Repository>, GatewayError> {
        let path = format!("/users/{}/repos", encode_segment(user));
        let wire: Vec<WireRepository> = self.paged_get(&path, &[("type", "owner")]).collect_all().await?;
        Ok(wire.into_iter().map(|r| r.into_repository(user)).collect())
    }

    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository, GatewayError> {
        let path = repo_path(owner, repo);
        let wire: WireRepository = self.get_json(&path).await?;
        Ok(wire.into_repository(owner))
    }

    pub async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, GatewayError> {
        let path = format!("{}/branches", repo_path(owner, repo));
        let wire: Vec<WireBranch> = self.paged_get(&path, &[]).collect_all().await?;
        Ok(wire.into_iter().map(Branch::from).collect())
    }

    /// Open, closed and merged pull requests.
    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        let path = format!("{}/pulls", repo_path(owner, repo));
        let wire: Vec<WirePullRequest> = self.paged_get(&path, &[("state", "all")]).collect_all().await?;
        Ok(wire.into_iter().map(PullRequest::from).collect())
    }

    /// Author of the commit at `reference` (a sha or a branch name).
    pub async fn commit_author(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<String, GatewayError> {
        let path = format!("{}/commits/{}", repo_path(owner, repo), encode_segment(reference));
        let wire: WireCommit = self.get_json(&path).await?;
        Ok(wire.author_name())
    }

    // ── writes ───────────────────────────────────────────────────────

    /// Delete `refs/heads/<branch>`. A ref that no longer exists counts as done.
    pub async fn delete_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MutationResult, GatewayError> {
        let path = format!("{}/git/refs/heads/{}", repo_path(owner, repo), encode_ref(branch));
        let request = ApiRequest {
            method: HttpMethod::Delete,
            url: self.url(&path),
            query: Vec::new(),
            body: None,
        };
        match self.execute(&request).await {
            Ok(_) => Ok(MutationResult::Applied),
            // A write can 404 on a repository the token cannot modify, so
            // confirm the ref is really gone before calling it done.
            Err(err @ GatewayError::NotFound { .. }) => {
                if self.branch_ref_exists(owner, repo, branch).await? {
                    warn!(owner, repo, branch, "branch still exists after a 404 on delete");
                    Err(err)
                } else {
                    Ok(MutationResult::AlreadyDone)
                }
            }
            Err(GatewayError::Validation {
                status: 422,
                message,
                ..
            }) if message.contains("Reference does not exist") => Ok(MutationResult::AlreadyDone),
            Err(err) => Err(err),
        }
    }

    async fn branch_ref_exists(&self, owner: &str, repo: &str, branch: &str) -> Result<bool, GatewayError> {
        let path = format!("{}/git/ref/heads/{}", repo_path(owner, repo), encode_ref(branch));
        match self.execute(&ApiRequest::get(self.url(&path))).await {
            Ok(_) => Ok(true),
            Err(GatewayError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Set a pull request's state to closed. Closing a closed PR is a no-op.
    pub async fn close_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<MutationResult, GatewayError> {
        let path = format!("{}/pulls/{}", repo_path(owner, repo), number);
        let request = ApiRequest {
            method: HttpMethod::Patch,
            url: self.url(&path),
            query: Vec::new(),
            body: Some(serde_json::json!({ "state": "closed" })),
        };
        self.execute(&request).await?;
        Ok(MutationResult::Applied)
    }
}

fn repo_path(owner: &str, repo: &str) -> String {
    format!("/repos/{}/{}", encode_segment(owner), encode_segment(repo))
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Branch names may contain `/`; each component is encoded on its own.
fn encode_ref(name: &str) -> String {
    name.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}
