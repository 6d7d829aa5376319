//! Typed error hierarchy for orgscan.
//!
//! Three enums cover the three layers:
//! - `TransportError`: a single HTTP round trip failed before a status arrived
//! - `GatewayError`: a remote call failed after the retry policy was applied
//! - `ScanError`: the scan as a whole cannot proceed

use thiserror::Error;

/// Failures below the HTTP status layer. All of them are treated as transient.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Errors from a remote call, after retries.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("GitHub rejected the credentials for {endpoint} (401)")]
    Unauthorized { endpoint: String },

    #[error("GitHub refused access to {endpoint} (403): {message}")]
    Forbidden { endpoint: String, message: String },

    #[error("{endpoint} not found (404)")]
    NotFound { endpoint: String },

    #[error("GitHub rejected the request to {endpoint} ({status}): {message}")]
    Validation {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("{endpoint} still failing after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("{endpoint} returned more than {max_pages} pages")]
    TooManyPages { endpoint: String, max_pages: usize },
}

impl GatewayError {
    /// Endpoint the failing call targeted.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Unauthorized { endpoint }
            | Self::Forbidden { endpoint, .. }
            | Self::NotFound { endpoint }
            | Self::Validation { endpoint, .. }
            | Self::RetriesExhausted { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::TooManyPages { endpoint, .. } => endpoint,
        }
    }

    /// Whether the failure is a credential or permission problem.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }
}

/// Errors that abort a scan or a cleanup run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No scan target: set GITHUB_ORG or pass --org (optionally with --repo)")]
    MissingTarget,

    #[error("Invalid target '{0}': expected an organization name or owner/repo")]
    InvalidTarget(String),

    #[error("{message}")]
    Authentication {
        message: String,
        #[source]
        source: GatewayError,
    },

    #[error("Organization or user '{org}' not found or not accessible")]
    OrganizationNotFound { org: String },

    #[error("Repository '{owner}/{repo}' not found or not accessible")]
    RepositoryNotFound { owner: String, repo: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScanError {
    /// Build the actionable diagnostic for an authentication failure at
    /// enumeration time.
    pub fn authentication(source: GatewayError, has_token: bool) -> Self {
        let message = match (&source, has_token) {
            (GatewayError::Unauthorized { .. }, false) => {
                "GitHub requires authentication for this target: set GITHUB_TOKEN".to_string()
            }
            (GatewayError::Unauthorized { .. }, true) => {
                "GitHub rejected GITHUB_TOKEN: the token is invalid or expired".to_string()
            }
            (_, false) => format!(
                "GitHub denied access to {} without a token: set GITHUB_TOKEN (unauthenticated quota is 60 requests/hour)",
                source.endpoint()
            ),
            (_, true) => format!(
                "GitHub denied access to {}: the token lacks the required scope (repo, read:org)",
                source.endpoint()
            ),
        };
        Self::Authentication { message, source }
    }
}
