//! Inbound trigger payloads.
//!
//! Only the fields the engine reads are modelled; everything else in the
//! platform's webhook JSON is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelPayload {
    pub name: String,
}

/// Issue actions the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueAction {
    Opened,
    Reopened,
    Edited,
    #[serde(other)]
    Other,
}

impl IssueAction {
    pub fn triggers_check(&self) -> bool {
        matches!(
            self,
            IssueAction::Opened | IssueAction::Reopened | IssueAction::Edited
        )
    }
}

/// Issue as seen in the event. Body, author and labels are re-fetched, since
/// queued payloads go stale.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuePayload {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    /// Present when the "issue" is really a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    pub action: IssueAction,
    pub issue: IssuePayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Closed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadPayload {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub merged: Option<bool>,
    pub head: HeadPayload,
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
}

impl PullRequestPayload {
    pub fn is_merged(&self) -> bool {
        self.merged.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub pull_request: PullRequestPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    /// Full ref, e.g. `refs/heads/master`.
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    #[serde(default)]
    pub head_commit: Option<CommitPayload>,
}

impl PushEvent {
    /// Branch name the push landed on, if the ref is a branch.
    pub fn branch(&self) -> Option<&str> {
        self.ref_name.strip_prefix("refs/heads/")
    }
}

/// A decoded trigger, dispatched on the platform's event name.
#[derive(Debug, Clone)]
pub enum TriggerEvent {
    Issues(IssuesEvent),
    PullRequest(PullRequestEvent),
    Push(PushEvent),
    Unsupported(String),
}

impl TriggerEvent {
    /// Decode `payload` according to `event_name` (`issues`, `pull_request`,
    /// `push`). Other event names decode to [`TriggerEvent::Unsupported`].
    pub fn parse(event_name: &str, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match event_name {
            "issues" => TriggerEvent::Issues(serde_json::from_str(payload)?),
            "pull_request" | "pull_request_target" => {
                TriggerEvent::PullRequest(serde_json::from_str(payload)?)
            }
            "push" => TriggerEvent::Push(serde_json::from_str(payload)?),
            other => TriggerEvent::Unsupported(other.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            TriggerEvent::Issues(_) => "issues",
            TriggerEvent::PullRequest(_) => "pull_request",
            TriggerEvent::Push(_) => "push",
            TriggerEvent::Unsupported(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_issue_payload_with_null_body() {
        let payload = r#"{
            "action": "opened",
            "issue": {
                "number": 12,
                "title": "Plugin: 复读机",
                "body": null,
                "user": {"login": "octocat"},
                "labels": [{"name": "Plugin", "color": "ffffff"}]
            }
        }"#;
        let event = TriggerEvent::parse("issues", payload).unwrap();
        let TriggerEvent::Issues(event) = event else {
            panic!("expected issues event");
        };
        assert_eq!(event.action, IssueAction::Opened);
        assert!(event.action.triggers_check());
        assert_eq!(event.issue.number, 12);
        assert_eq!(event.issue.title, "Plugin: 复读机");
        assert!(event.issue.pull_request.is_none());
    }

    #[test]
    fn unknown_actions_decode_as_other() {
        let payload = r#"{"action": "labeled", "issue": {"number": 1}}"#;
        let TriggerEvent::Issues(event) = TriggerEvent::parse("issues", payload).unwrap() else {
            panic!("expected issues event");
        };
        assert_eq!(event.action, IssueAction::Other);
        assert!(!event.action.triggers_check());
    }

    #[test]
    fn parses_closed_pull_request() {
        let payload = r#"{
            "action": "closed",
            "number": 3,
            "pull_request": {
                "number": 3,
                "merged": true,
                "head": {"ref": "publish/issue7"},
                "labels": [{"name": "Bot"}]
            }
        }"#;
        let TriggerEvent::PullRequest(event) = TriggerEvent::parse("pull_request", payload).unwrap()
        else {
            panic!("expected pull request event");
        };
        assert_eq!(event.action, PullRequestAction::Closed);
        assert!(event.pull_request.is_merged());
        assert_eq!(event.pull_request.head.ref_name, "publish/issue7");
    }

    #[test]
    fn push_branch_strips_ref_prefix() {
        let payload = r#"{"ref": "refs/heads/master", "head_commit": {"message": ":beers: publish bot x"}}"#;
        let TriggerEvent::Push(event) = TriggerEvent::parse("push", payload).unwrap() else {
            panic!("expected push event");
        };
        assert_eq!(event.branch(), Some("master"));
        assert_eq!(event.head_commit.unwrap().message, ":beers: publish bot x");
    }

    #[test]
    fn other_events_are_unsupported() {
        let event = TriggerEvent::parse("workflow_dispatch", "{}").unwrap();
        assert_eq!(event.name(), "workflow_dispatch");
        assert!(matches!(event, TriggerEvent::Unsupported(_)));
    }
}
