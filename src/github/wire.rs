//! GitHub wire payloads (the subset of fields the scanner reads).
//!
//! Every optional field gets an explicit default here so nothing downstream
//! ever sees a missing value.

use crate::model::{Branch, PrState, PullRequest, Repository};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub(crate) const UNKNOWN_AUTHOR: &str = "unknown";
const FALLBACK_DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Deserialize)]
pub struct WireOwner {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct WireRepository {
    pub name: String,
    #[serde(default)]
    pub owner: Option<WireOwner>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl WireRepository {
    /// `fallback_owner` is used when the payload omits the owner.
    pub fn into_repository(self, fallback_owner: &str) -> Repository {
        let owner = self
            .owner
            .map(|o| o.login)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| fallback_owner.to_string());
        let html_url = self
            .html_url
            .unwrap_or_else(|| format!("https://github.com/{}/{}", owner, self.name));
        Repository {
            default_branch: self
                .default_branch
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| FALLBACK_DEFAULT_BRANCH.to_string()),
            archived: self.archived,
            last_activity: self.pushed_at.or(self.updated_at),
            html_url,
            name: self.name,
            owner,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireCommitRef {
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct WireBranch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub commit: Option<WireCommitRef>,
}

impl From<WireBranch> for Branch {
    fn from(wire: WireBranch) -> Self {
        Branch {
            name: wire.name,
            protected: wire.protected,
            head_sha: wire.commit.map(|c| c.sha).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireGitAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireGitCommit {
    #[serde(default)]
    pub author: Option<WireGitAuthor>,
}

/// A single commit as returned by `GET /repos/{owner}/{repo}/commits/{ref}`.
#[derive(Debug, Deserialize)]
pub struct WireCommit {
    #[serde(default)]
    pub commit: Option<WireGitCommit>,
    #[serde(default)]
    pub author: Option<WireOwner>,
}

impl WireCommit {
    /// Git author name, else the linked account login, else `unknown`.
    pub fn author_name(self) -> String {
        self.commit
            .and_then(|c| c.author)
            .and_then(|a| a.name)
            .filter(|n| !n.is_empty())
            .or_else(|| self.author.map(|u| u.login).filter(|l| !l.is_empty()))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct WireHead {
    #[serde(rename = "ref", default)]
    pub ref_name: String,
}

#[derive(Debug, Deserialize)]
pub struct WirePullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<WireOwner>,
    #[serde(default)]
    pub head: Option<WireHead>,
    #[serde(default)]
    pub html_url: String,
}

impl From<WirePullRequest> for PullRequest {
    fn from(wire: WirePullRequest) -> Self {
        let state = if wire.state == "open" {
            PrState::Open
        } else if wire.merged_at.is_some() {
            PrState::Merged
        } else {
            PrState::Closed
        };
        PullRequest {
            number: wire.number,
            title: wire.title,
            state,
            created_at: wire.created_at,
            closed_at: wire.closed_at,
            merged_at: wire.merged_at,
            author: wire
                .user
                .map(|u| u.login)
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            head_branch: wire.head.map(|h| h.ref_name).unwrap_or_default(),
            html_url: wire.html_url,
        }
    }
}
