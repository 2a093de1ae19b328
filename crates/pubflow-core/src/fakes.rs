//! In-memory fakes for the collaborator ports (testing only).
//!
//! Provides `FakePlatform`, `RecordingGit` and `StaticProbe`, which satisfy
//! the trait contracts without network access or a repository on disk.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{GitError, PlatformError};
use crate::ports::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build an open issue.
pub fn issue(number: u64, title: &str, body: &str, author: &str, labels: &[&str]) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        body: body.to_string(),
        author: author.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        state: IssueState::Open,
        is_pull_request: false,
    }
}

/// Build an open pull request summary.
pub fn pull_request(number: u64, title: &str, head: &str, labels: &[&str]) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        head: head.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// FakePlatform
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct FakePull {
    pull: PullRequest,
    open: bool,
}

#[derive(Debug, Default)]
struct PlatformState {
    issues: BTreeMap<u64, Issue>,
    pulls: Vec<FakePull>,
    comments: BTreeMap<u64, Vec<Comment>>,
    created_pulls: Vec<NewPullRequest>,
    closed: Vec<(u64, CloseReason)>,
    failing_issues: HashSet<u64>,
    next_pull: u64,
    next_comment: u64,
}

/// In-memory issue host.
///
/// Pull requests created through the trait are numbered from 1000 so they
/// never collide with seeded issues.
#[derive(Debug, Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_issue(&self, issue: Issue) {
        lock(&self.state).issues.insert(issue.number, issue);
    }

    pub fn insert_pull_request(&self, pull: PullRequest) {
        lock(&self.state).pulls.push(FakePull { pull, open: true });
    }

    /// Make every `get_issue(number)` fail with a transport error.
    pub fn fail_issue_fetch(&self, number: u64) {
        lock(&self.state).failing_issues.insert(number);
    }

    pub fn close_pull_request(&self, number: u64) {
        let mut state = lock(&self.state);
        for fake in state.pulls.iter_mut().filter(|p| p.pull.number == number) {
            fake.open = false;
        }
    }

    pub fn issue_snapshot(&self, number: u64) -> Option<Issue> {
        lock(&self.state).issues.get(&number).cloned()
    }

    pub fn open_pull_requests(&self) -> Vec<PullRequest> {
        lock(&self.state)
            .pulls
            .iter()
            .filter(|p| p.open)
            .map(|p| p.pull.clone())
            .collect()
    }

    /// Every pull request creation request that was accepted.
    pub fn created_pull_requests(&self) -> Vec<NewPullRequest> {
        lock(&self.state).created_pulls.clone()
    }

    pub fn comments(&self, issue: u64) -> Vec<Comment> {
        lock(&self.state)
            .comments
            .get(&issue)
            .cloned()
            .unwrap_or_default()
    }

    pub fn closed_issues(&self) -> Vec<(u64, CloseReason)> {
        lock(&self.state).closed.clone()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn get_issue(&self, number: u64) -> PlatformResult<Issue> {
        let state = lock(&self.state);
        if state.failing_issues.contains(&number) {
            return Err(PlatformError::Transport(format!(
                "injected failure fetching issue #{number}"
            )));
        }
        state
            .issues
            .get(&number)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("issue #{number}")))
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        let mut found = false;
        if let Some(issue) = state.issues.get_mut(&number) {
            for label in labels {
                if !issue.labels.contains(label) {
                    issue.labels.push(label.clone());
                }
            }
            found = true;
        }
        for fake in state.pulls.iter_mut().filter(|p| p.pull.number == number) {
            for label in labels {
                if !fake.pull.labels.contains(label) {
                    fake.pull.labels.push(label.clone());
                }
            }
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(PlatformError::NotFound(format!("issue #{number}")))
        }
    }

    async fn close_issue(&self, number: u64, reason: CloseReason) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        let issue = state
            .issues
            .get_mut(&number)
            .ok_or_else(|| PlatformError::NotFound(format!("issue #{number}")))?;
        issue.state = IssueState::Closed;
        state.closed.push((number, reason));
        Ok(())
    }

    async fn update_issue_title(&self, number: u64, title: &str) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        let issue = state
            .issues
            .get_mut(&number)
            .ok_or_else(|| PlatformError::NotFound(format!("issue #{number}")))?;
        issue.title = title.to_string();
        Ok(())
    }

    async fn update_issue_body(&self, number: u64, body: &str) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        let issue = state
            .issues
            .get_mut(&number)
            .ok_or_else(|| PlatformError::NotFound(format!("issue #{number}")))?;
        issue.body = body.to_string();
        Ok(())
    }

    async fn list_open_pull_requests(&self) -> PlatformResult<Vec<PullRequest>> {
        Ok(self.open_pull_requests())
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> PlatformResult<PullRequest> {
        let mut state = lock(&self.state);
        if state
            .pulls
            .iter()
            .any(|p| p.open && p.pull.head == request.head)
        {
            return Err(PlatformError::Duplicate(format!(
                "pull request for {}",
                request.head
            )));
        }
        state.next_pull += 1;
        let pull = PullRequest {
            number: 1000 + state.next_pull,
            title: request.title.clone(),
            head: request.head.clone(),
            labels: Vec::new(),
        };
        state.pulls.push(FakePull {
            pull: pull.clone(),
            open: true,
        });
        state.created_pulls.push(request.clone());
        Ok(pull)
    }

    async fn update_pull_request_title(&self, number: u64, title: &str) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        let fake = state
            .pulls
            .iter_mut()
            .find(|p| p.pull.number == number)
            .ok_or_else(|| PlatformError::NotFound(format!("pull request #{number}")))?;
        fake.pull.title = title.to_string();
        Ok(())
    }

    async fn list_comments(&self, number: u64) -> PlatformResult<Vec<Comment>> {
        Ok(self.comments(number))
    }

    async fn create_comment(&self, number: u64, body: &str) -> PlatformResult<Comment> {
        let mut state = lock(&self.state);
        state.next_comment += 1;
        let comment = Comment {
            id: state.next_comment,
            body: body.to_string(),
        };
        state
            .comments
            .entry(number)
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        let comment = state
            .comments
            .values_mut()
            .flat_map(|c| c.iter_mut())
            .find(|c| c.id == comment_id)
            .ok_or_else(|| PlatformError::NotFound(format!("comment {comment_id}")))?;
        comment.body = body.to_string();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingGit
// ---------------------------------------------------------------------------

/// One recorded git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOp {
    SwitchCreate(String),
    ResetHard(String),
    AddAll,
    Commit { message: String, author: String },
    Push { branch: String, force: bool },
    DeleteRemoteBranch(String),
}

impl GitOp {
    fn name(&self) -> &'static str {
        match self {
            GitOp::SwitchCreate(_) => "switch_create",
            GitOp::ResetHard(_) => "reset_hard",
            GitOp::AddAll => "add_all",
            GitOp::Commit { .. } => "commit",
            GitOp::Push { .. } => "push",
            GitOp::DeleteRemoteBranch(_) => "delete_remote_branch",
        }
    }
}

/// Git port that records invocations instead of running them.
#[derive(Debug, Default)]
pub struct RecordingGit {
    ops: Mutex<Vec<GitOp>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl RecordingGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of the named operation (e.g. `"push"`) fail after
    /// being recorded.
    pub fn fail_on(&self, op: &'static str) {
        lock(&self.failing).insert(op);
    }

    pub fn ops(&self) -> Vec<GitOp> {
        lock(&self.ops).clone()
    }

    /// Branches pushed, in order.
    pub fn pushed_branches(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                GitOp::Push { branch, .. } => Some(branch),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: GitOp) -> GitResult<()> {
        let name = op.name();
        lock(&self.ops).push(op);
        if lock(&self.failing).contains(name) {
            return Err(GitError::new(name, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl GitPort for RecordingGit {
    async fn switch_create(&self, branch: &str) -> GitResult<()> {
        self.record(GitOp::SwitchCreate(branch.to_string()))
    }

    async fn reset_hard(&self, target: &str) -> GitResult<()> {
        self.record(GitOp::ResetHard(target.to_string()))
    }

    async fn add_all(&self) -> GitResult<()> {
        self.record(GitOp::AddAll)
    }

    async fn commit(&self, message: &str, author: &CommitAuthor) -> GitResult<()> {
        self.record(GitOp::Commit {
            message: message.to_string(),
            author: author.name.clone(),
        })
    }

    async fn push(&self, branch: &str, force: bool) -> GitResult<()> {
        self.record(GitOp::Push {
            branch: branch.to_string(),
            force,
        })
    }

    async fn delete_remote_branch(&self, branch: &str) -> GitResult<()> {
        self.record(GitOp::DeleteRemoteBranch(branch.to_string()))
    }
}

// ---------------------------------------------------------------------------
// StaticProbe
// ---------------------------------------------------------------------------

/// Probe answering from a fixed URL → status table.
///
/// Unlisted URLs answer with the default, which is "no response".
#[derive(Debug, Default)]
pub struct StaticProbe {
    statuses: HashMap<String, u16>,
    default: Option<u16>,
    seen: Mutex<Vec<String>>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.insert(url.into(), status);
        self
    }

    pub fn with_default(mut self, status: u16) -> Self {
        self.default = Some(status);
        self
    }

    /// URLs probed so far, in order.
    pub fn seen(&self) -> Vec<String> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl Probe for StaticProbe {
    async fn status(&self, url: &str) -> Option<u16> {
        lock(&self.seen).push(url.to_string());
        self.statuses.get(url).copied().or(self.default)
    }
}
