//! GitHub REST implementation of the [`Platform`] port.

use std::time::Duration;

use async_trait::async_trait;
use pubflow_core::ports::{
    CloseReason, Comment, Issue, IssueState, NewPullRequest, Platform, PlatformResult, PullRequest,
};
use pubflow_core::{PlatformError, RepoRef};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{GithubError, Result};

/// Default REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    user: GithubUser,
    #[serde(default)]
    labels: Vec<GithubLabel>,
    state: IssueState,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<GithubIssue> for Issue {
    fn from(raw: GithubIssue) -> Self {
        Issue {
            number: raw.number,
            title: raw.title,
            body: raw.body.unwrap_or_default(),
            author: raw.user.login,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            state: raw.state,
            is_pull_request: raw.pull_request.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GithubHead {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Debug, Deserialize)]
struct GithubPull {
    number: u64,
    title: String,
    head: GithubHead,
    #[serde(default)]
    labels: Vec<GithubLabel>,
}

impl From<GithubPull> for PullRequest {
    fn from(raw: GithubPull) -> Self {
        PullRequest {
            number: raw.number,
            title: raw.title,
            head: raw.head.ref_name,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GithubComment {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

impl From<GithubComment> for Comment {
    fn from(raw: GithubComment) -> Self {
        Comment {
            id: raw.id,
            body: raw.body.unwrap_or_default(),
        }
    }
}

/// Authenticated client scoped to one repository.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubClient {
    pub fn new(api_base: &str, token: &str, repo: RepoRef) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pubflow/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| GithubError::InvalidToken)?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base, self.repo.owner, self.repo.name, path
        )
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> PlatformResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Transport(format!("{operation}: {e}")))?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "github api call");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(operation, status, body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> PlatformResult<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PlatformError::Decode(format!("{operation}: {e}")))
    }

    /// Collect every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> PlatformResult<Vec<T>> {
        let mut rows = Vec::new();
        let mut page = 1_u32;
        loop {
            let page_str = page.to_string();
            let per_page = PAGE_SIZE.to_string();
            let request = self
                .http
                .get(url)
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_str.as_str())]);
            let chunk: Vec<T> = self.send_json(operation, request).await?;
            let len = chunk.len();
            rows.extend(chunk);
            if len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }
}

/// Map a non-success response to the port's error taxonomy.
fn classify_failure(operation: &str, status: StatusCode, body: String) -> PlatformError {
    match status {
        StatusCode::NOT_FOUND => PlatformError::NotFound(operation.to_string()),
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("already exists") => {
            PlatformError::Duplicate(operation.to_string())
        }
        _ => PlatformError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: truncate(&body, 500),
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[async_trait]
impl Platform for GithubClient {
    async fn get_issue(&self, number: u64) -> PlatformResult<Issue> {
        let raw: GithubIssue = self
            .send_json("get issue", self.http.get(self.url(&format!("/issues/{number}"))))
            .await?;
        Ok(raw.into())
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> PlatformResult<()> {
        let request = self
            .http
            .post(self.url(&format!("/issues/{number}/labels")))
            .json(&json!({ "labels": labels }));
        self.send("add labels", request).await?;
        Ok(())
    }

    async fn close_issue(&self, number: u64, reason: CloseReason) -> PlatformResult<()> {
        let request = self
            .http
            .patch(self.url(&format!("/issues/{number}")))
            .json(&json!({ "state": "closed", "state_reason": reason.as_str() }));
        self.send("close issue", request).await?;
        Ok(())
    }

    async fn update_issue_title(&self, number: u64, title: &str) -> PlatformResult<()> {
        let request = self
            .http
            .patch(self.url(&format!("/issues/{number}")))
            .json(&json!({ "title": title }));
        self.send("update issue title", request).await?;
        Ok(())
    }

    async fn update_issue_body(&self, number: u64, body: &str) -> PlatformResult<()> {
        let request = self
            .http
            .patch(self.url(&format!("/issues/{number}")))
            .json(&json!({ "body": body }));
        self.send("update issue body", request).await?;
        Ok(())
    }

    async fn list_open_pull_requests(&self) -> PlatformResult<Vec<PullRequest>> {
        let rows: Vec<GithubPull> = self
            .list_all("list pull requests", &self.url("/pulls"), &[("state", "open")])
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_open_pull_request(&self, head: &str) -> PlatformResult<Option<PullRequest>> {
        let head_filter = format!("{}:{}", self.repo.owner, head);
        let rows: Vec<GithubPull> = self
            .list_all(
                "find pull request",
                &self.url("/pulls"),
                &[("state", "open"), ("head", head_filter.as_str())],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(PullRequest::from)
            .find(|pr| pr.head == head))
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> PlatformResult<PullRequest> {
        let raw: GithubPull = self
            .send_json(
                "create pull request",
                self.http.post(self.url("/pulls")).json(request),
            )
            .await?;
        Ok(raw.into())
    }

    async fn update_pull_request_title(&self, number: u64, title: &str) -> PlatformResult<()> {
        let request = self
            .http
            .patch(self.url(&format!("/pulls/{number}")))
            .json(&json!({ "title": title }));
        self.send("update pull request title", request).await?;
        Ok(())
    }

    async fn list_comments(&self, number: u64) -> PlatformResult<Vec<Comment>> {
        let rows: Vec<GithubComment> = self
            .list_all(
                "list comments",
                &self.url(&format!("/issues/{number}/comments")),
                &[],
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_comment(&self, number: u64, body: &str) -> PlatformResult<Comment> {
        let raw: GithubComment = self
            .send_json(
                "create comment",
                self.http
                    .post(self.url(&format!("/issues/{number}/comments")))
                    .json(&json!({ "body": body })),
            )
            .await?;
        Ok(raw.into())
    }

    async fn update_comment(&self, comment_id: u64, body: &str) -> PlatformResult<()> {
        let request = self
            .http
            .patch(self.url(&format!("/issues/comments/{comment_id}")))
            .json(&json!({ "body": body }));
        self.send("update comment", request).await?;
        Ok(())
    }
}
