//! Pull request reconciler: the publish state machine.
//!
//! Per issue: `NoSubmission → PendingValidation → Rejected | OpenPR →
//! Merged | Abandoned`. The issue body is the single source of truth; the
//! branch name is derived from the issue number and never stored.
//!
//! Every operation is safe to re-run. Recovery from a half-finished run is
//! the next run, not a rollback.

use std::sync::Arc;

use tracing::Instrument;

use crate::classify::{self, branch_name, issue_number_from_ref};
use crate::config::PublishConfig;
use crate::domain::{
    IssuesEvent, PlatformError, PubflowError, PullRequestAction, PullRequestEvent, PushEvent,
    Result, SubmissionRecord, TriggerEvent,
};
use crate::extract::{self, upsert_block};
use crate::obs::{self, issue_span};
use crate::ports::{
    CloseReason, CommitAuthor, GitPort, IssueState, NewPullRequest, Platform, Probe, PullRequest,
};
use crate::registry::RegistryStore;
use crate::report::Reporter;
use crate::validate::Validator;

/// How a run ended, short of a run-fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The event needed no action.
    Skipped(String),
    Succeeded,
    /// The submission was rejected or part of a batch failed.
    Failed(String),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}

/// Result of a resync batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    /// Pull request numbers whose branch was rebuilt.
    pub refreshed: Vec<u64>,
    /// Pull requests that could not be rebuilt, with the reason.
    pub failures: Vec<(u64, String)>,
}

impl ResyncSummary {
    pub fn into_outcome(self) -> RunOutcome {
        if self.failures.is_empty() {
            RunOutcome::Succeeded
        } else {
            let pulls: Vec<String> = self.failures.iter().map(|(n, _)| format!("#{n}")).collect();
            RunOutcome::Failed(format!("resync failed for {}", pulls.join(", ")))
        }
    }
}

/// Drives platform, git and registry to keep one pull request per issue.
pub struct Reconciler {
    config: PublishConfig,
    platform: Arc<dyn Platform>,
    git: Arc<dyn GitPort>,
    validator: Validator,
    reporter: Reporter,
    registry: RegistryStore,
}

impl Reconciler {
    pub fn new(
        config: PublishConfig,
        platform: Arc<dyn Platform>,
        git: Arc<dyn GitPort>,
        probe: Arc<dyn Probe>,
    ) -> Self {
        let validator = Validator::new(probe)
            .with_package_index(config.package_index.clone())
            .with_repo_host(config.repo_host.clone());
        let registry = RegistryStore::new(config.workspace.clone(), config.registry.clone());
        Self {
            reporter: Reporter::new(platform.clone()),
            validator,
            registry,
            config,
            platform,
            git,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Dispatch one trigger event.
    pub async fn handle(&self, event: &TriggerEvent) -> Result<RunOutcome> {
        tracing::info!(event = %event.name(), "handling trigger");
        match event {
            TriggerEvent::Issues(e) => self.handle_issue(e).await,
            TriggerEvent::PullRequest(e) => self.handle_pull_request_closed(e).await,
            TriggerEvent::Push(e) => self.handle_push(e).await,
            TriggerEvent::Unsupported(name) => {
                Ok(RunOutcome::Skipped(format!("unsupported event {name}")))
            }
        }
    }

    /// Issue opened, reopened or edited.
    pub async fn handle_issue(&self, event: &IssuesEvent) -> Result<RunOutcome> {
        if !event.action.triggers_check() {
            return Ok(RunOutcome::Skipped(format!(
                "issue action {:?} needs no check",
                event.action
            )));
        }
        if event.issue.pull_request.is_some() {
            return Ok(RunOutcome::Skipped(
                "event concerns a pull request".to_string(),
            ));
        }
        tracing::info!(
            issue = event.issue.number,
            title = %event.issue.title,
            action = ?event.action,
            "checking issue"
        );
        self.check_issue(event.issue.number).await
    }

    /// Extract, validate and, on pass, publish the submission of `number`.
    pub async fn check_issue(&self, number: u64) -> Result<RunOutcome> {
        self.check_issue_inner(number)
            .instrument(issue_span(number))
            .await
    }

    async fn check_issue_inner(&self, number: u64) -> Result<RunOutcome> {
        // payloads can be stale when events queue up
        let issue = self.platform.get_issue(number).await?;
        if issue.state != IssueState::Open || issue.is_pull_request {
            return Ok(RunOutcome::Skipped(format!("issue #{number} is not open")));
        }

        let Some(kind) =
            classify::by_labels(&issue.labels).or_else(|| classify::by_title(&issue.title))
        else {
            return Ok(RunOutcome::Skipped(format!(
                "issue #{number} is not a publish request"
            )));
        };

        if !issue.labels.iter().any(|l| l == kind.label()) {
            self.platform
                .add_labels(number, &[kind.label().to_string()])
                .await?;
        }

        let record = match extract::extract(kind, &issue.body, &issue.author) {
            Ok(record) => record,
            Err(e) => {
                obs::emit_extraction_failed(number, kind, &e.missing);
                self.reporter.publish_extraction_error(number, &e).await?;
                return Ok(RunOutcome::Failed(e.to_string()));
            }
        };

        let report = self.validator.validate(&record).await;
        if !report.pass() {
            self.reporter.publish(number, &report, &record).await?;
            return Ok(RunOutcome::Failed(format!(
                "checks failed for {}",
                record.title()
            )));
        }

        let branch = self.rebuild_branch(number, &record).await?;
        self.ensure_pull_request(number, &record, &branch).await?;

        if issue.title != record.title() {
            self.platform
                .update_issue_title(number, &record.title())
                .await?;
        }
        if let Some(body) = upsert_block(&issue.body, &record) {
            self.platform.update_issue_body(number, &body).await?;
        }

        self.reporter.publish(number, &report, &record).await?;
        Ok(RunOutcome::Succeeded)
    }

    /// Pull request closed: close the linked issue, drop the branch and, on
    /// merge, resync the remaining submissions.
    pub async fn handle_pull_request_closed(&self, event: &PullRequestEvent) -> Result<RunOutcome> {
        if event.action != PullRequestAction::Closed {
            return Ok(RunOutcome::Skipped(
                "pull request was not closed".to_string(),
            ));
        }
        let pull = &event.pull_request;
        let labels: Vec<&str> = pull.labels.iter().map(|l| l.name.as_str()).collect();
        if classify::by_labels(&labels).is_none() {
            return Ok(RunOutcome::Skipped(format!(
                "pull request #{} is not a submission",
                pull.number
            )));
        }

        // an undecodable head only fails this pull request; a merge still
        // resyncs the others
        let merged = pull.is_merged();
        let unlinked = match issue_number_from_ref(&pull.head.ref_name) {
            Some(number) => {
                self.close_linked_issue(number, &pull.head.ref_name, merged)
                    .instrument(issue_span(number))
                    .await?;
                None
            }
            None => {
                let err = PubflowError::UnlinkedBranch(pull.head.ref_name.clone());
                tracing::error!(pull = pull.number, error = %err, "cannot resolve linked issue");
                Some(err.to_string())
            }
        };

        let outcome = if merged {
            self.resync_open_pull_requests(Some(pull.number))
                .await?
                .into_outcome()
        } else {
            RunOutcome::Succeeded
        };

        Ok(match (unlinked, outcome) {
            (None, outcome) => outcome,
            (Some(reason), RunOutcome::Failed(resync)) => {
                RunOutcome::Failed(format!("{reason}; {resync}"))
            }
            (Some(reason), _) => RunOutcome::Failed(reason),
        })
    }

    async fn close_linked_issue(&self, number: u64, branch: &str, merged: bool) -> Result<()> {
        let issue = self.platform.get_issue(number).await?;
        if issue.state == IssueState::Open {
            let reason = if merged {
                CloseReason::Completed
            } else {
                CloseReason::NotPlanned
            };
            self.platform.close_issue(number, reason).await?;
            obs::emit_issue_closed(number, merged);
        } else {
            tracing::info!("issue already closed");
        }

        // the host may have deleted the branch already
        if let Err(e) = self.git.delete_remote_branch(branch).await {
            obs::emit_transient_failure("delete_remote_branch", &e);
        }
        Ok(())
    }

    /// Publish commit landed on the base branch: resync every submission.
    pub async fn handle_push(&self, event: &PushEvent) -> Result<RunOutcome> {
        if event.branch() != Some(self.config.base.as_str()) {
            return Ok(RunOutcome::Skipped(format!(
                "push to {} is not the base branch",
                event.ref_name
            )));
        }
        let message = event
            .head_commit
            .as_ref()
            .map(|c| c.message.as_str())
            .unwrap_or_default();
        let Some(kind) = classify::by_commit_message(message) else {
            return Ok(RunOutcome::Skipped("not a publish commit".to_string()));
        };
        tracing::info!(kind = %kind, "publish commit on base branch");

        let summary = self.resync_open_pull_requests(None).await?;
        Ok(summary.into_outcome())
    }

    /// Rebuild every open, kind-labelled pull request in listing order.
    ///
    /// A failure on one pull request is recorded and the batch continues;
    /// only run-fatal errors abort it.
    pub async fn resync_open_pull_requests(&self, exclude: Option<u64>) -> Result<ResyncSummary> {
        let pulls = self.platform.list_open_pull_requests().await?;
        let mut summary = ResyncSummary::default();

        for pull in pulls {
            if Some(pull.number) == exclude || classify::by_labels(&pull.labels).is_none() {
                continue;
            }
            match self.resync_one(&pull).await {
                Ok(()) => summary.refreshed.push(pull.number),
                Err(e) if e.is_run_fatal() => return Err(e),
                Err(e) => {
                    obs::emit_resync_failed(pull.number, &e);
                    summary.failures.push((pull.number, e.to_string()));
                }
            }
        }

        obs::emit_resync_finished(summary.refreshed.len(), summary.failures.len());
        Ok(summary)
    }

    /// Re-derive one pull request's commit from its linked issue.
    pub async fn resync_one(&self, pull: &PullRequest) -> Result<()> {
        let number = issue_number_from_ref(&pull.head)
            .ok_or_else(|| PubflowError::UnlinkedBranch(pull.head.clone()))?;
        self.resync_issue(number, pull)
            .instrument(issue_span(number))
            .await
    }

    async fn resync_issue(&self, number: u64, pull: &PullRequest) -> Result<()> {
        tracing::info!(pull = pull.number, title = %pull.title, "resyncing pull request");

        let issue = self.platform.get_issue(number).await?;
        let kind = classify::by_labels(&issue.labels)
            .or_else(|| classify::by_labels(&pull.labels))
            .ok_or(PubflowError::Unclassified(number))?;
        let record = extract::extract_for_resync(kind, &issue.body, &issue.author)?;

        let branch = self.rebuild_branch(number, &record).await?;
        obs::emit_branch_refreshed(number, &branch);
        Ok(())
    }

    /// Branch from the base, append the record, commit and force-push.
    async fn rebuild_branch(&self, number: u64, record: &SubmissionRecord) -> Result<String> {
        let branch = branch_name(number);
        self.git.switch_create(&branch).await?;
        self.git.reset_hard(&self.config.base).await?;
        self.registry.append(record)?;
        self.git.add_all().await?;
        self.git
            .commit(
                &classify::commit_message(record.kind(), record.display_name()),
                &CommitAuthor::for_login(record.author()),
            )
            .await?;
        self.git.push(&branch, true).await?;
        Ok(branch)
    }

    /// Find-or-create the pull request for `branch`, then fix its title and
    /// label.
    async fn ensure_pull_request(
        &self,
        number: u64,
        record: &SubmissionRecord,
        branch: &str,
    ) -> Result<()> {
        let title = record.title();
        let label = record.kind().label().to_string();

        let (pull, created) = match self.platform.find_open_pull_request(branch).await? {
            Some(existing) => (Some(existing), false),
            None => {
                let request = NewPullRequest {
                    title: title.clone(),
                    head: branch.to_string(),
                    base: self.config.base.clone(),
                    body: format!("resolve #{number}"),
                };
                match self.platform.create_pull_request(&request).await {
                    Ok(pull) => (Some(pull), true),
                    Err(PlatformError::Duplicate(detail)) => {
                        tracing::info!(%detail, "pull request already exists");
                        (self.platform.find_open_pull_request(branch).await?, false)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let Some(pull) = pull else {
            return Ok(());
        };
        if !pull.labels.contains(&label) {
            self.platform.add_labels(pull.number, &[label]).await?;
        }
        if !created && pull.title != title {
            self.platform
                .update_pull_request_title(pull.number, &title)
                .await?;
        }
        obs::emit_pull_request_ensured(number, pull.number, branch, created);
        Ok(())
    }
}
