//! Collaborator ports for the reconciler.
//!
//! These traits define the narrow contracts the engine drives:
//! - `Platform`: the issue / pull request / comment host
//! - `GitPort`: working-tree branch, commit and push operations
//! - `Probe`: HTTP reachability checks used by the validator
//!
//! All traits are async and transport-agnostic. In-memory fakes live in the
//! `fakes` module; production implementations live in `pubflow-github`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{GitError, PlatformError};

/// Result type for platform calls.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Result type for git calls.
pub type GitResult<T> = std::result::Result<T, GitError>;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

/// Issue as fetched from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    /// Creator login.
    pub author: String,
    pub labels: Vec<String>,
    pub state: IssueState,
    /// The platform models pull requests as issues too.
    pub is_pull_request: bool,
}

/// Open pull request summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Head branch name (no `refs/heads/` prefix).
    pub head: String,
    pub labels: Vec<String>,
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: u64,
    pub body: String,
}

/// Why an issue is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Completed,
    NotPlanned,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Completed => "completed",
            CloseReason::NotPlanned => "not_planned",
        }
    }
}

/// Issue and pull request host.
///
/// Guarantees expected by the reconciler:
/// - `create_pull_request` fails with `PlatformError::Duplicate` when an open
///   pull request already exists for the same head.
/// - `list_open_pull_requests` returns pull requests in the host's listing
///   order.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn get_issue(&self, number: u64) -> PlatformResult<Issue>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> PlatformResult<()>;

    async fn close_issue(&self, number: u64, reason: CloseReason) -> PlatformResult<()>;

    async fn update_issue_title(&self, number: u64, title: &str) -> PlatformResult<()>;

    async fn update_issue_body(&self, number: u64, body: &str) -> PlatformResult<()>;

    async fn list_open_pull_requests(&self) -> PlatformResult<Vec<PullRequest>>;

    /// Open pull request whose head branch is `head`, if any.
    async fn find_open_pull_request(&self, head: &str) -> PlatformResult<Option<PullRequest>> {
        Ok(self
            .list_open_pull_requests()
            .await?
            .into_iter()
            .find(|pr| pr.head == head))
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> PlatformResult<PullRequest>;

    async fn update_pull_request_title(&self, number: u64, title: &str) -> PlatformResult<()>;

    async fn list_comments(&self, number: u64) -> PlatformResult<Vec<Comment>>;

    async fn create_comment(&self, number: u64, body: &str) -> PlatformResult<Comment>;

    async fn update_comment(&self, comment_id: u64, body: &str) -> PlatformResult<()>;
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Identity recorded on publish commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    /// Author for a platform login, using the no-reply address.
    pub fn for_login(login: &str) -> Self {
        Self {
            name: login.to_string(),
            email: format!("{login}@users.noreply.github.com"),
        }
    }
}

/// Working-tree operations, all relative to the configured workspace.
#[async_trait]
pub trait GitPort: Send + Sync {
    /// Create or reset `branch` at the current HEAD and switch to it.
    async fn switch_create(&self, branch: &str) -> GitResult<()>;

    async fn reset_hard(&self, target: &str) -> GitResult<()>;

    async fn add_all(&self) -> GitResult<()>;

    async fn commit(&self, message: &str, author: &CommitAuthor) -> GitResult<()>;

    async fn push(&self, branch: &str, force: bool) -> GitResult<()>;

    async fn delete_remote_branch(&self, branch: &str) -> GitResult<()>;
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// HTTP reachability check.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Status code of a GET to `url`; `None` on any transport failure.
    async fn status(&self, url: &str) -> Option<u16>;
}
