//! Structured observability hooks for the publish lifecycle.
//!
//! This module provides:
//! - Issue-scoped tracing spans via `issue_span`
//! - Emission functions for key lifecycle events: validation, pull request
//!   upkeep, issue closing and resync batches
//!
//! Events are emitted at `info!` level, except per-submission failures which
//! use `warn!`/`error!`.

use tracing::info;

use crate::domain::Kind;

/// Issue-scoped span; attach with `Instrument::instrument` so every log line
/// of a reconciliation carries the issue number.
///
/// ```ignore
/// reconcile(42).instrument(issue_span(42)).await
/// ```
pub fn issue_span(issue: u64) -> tracing::Span {
    tracing::info_span!("pubflow.issue", issue = issue)
}

/// Emit event: a submission finished its reachability checks.
pub fn emit_submission_validated(
    kind: Kind,
    name: &str,
    repo_reachable: bool,
    package_published: bool,
) {
    info!(
        event = "submission.validated",
        kind = %kind,
        name = %name,
        repo_reachable = repo_reachable,
        package_published = package_published,
        passed = repo_reachable && package_published,
    );
}

/// Emit event: the issue body could not be turned into a record.
pub fn emit_extraction_failed(issue: u64, kind: Kind, missing: &[&str]) {
    tracing::warn!(
        event = "submission.extraction_failed",
        issue = issue,
        kind = %kind,
        missing = %missing.join(","),
    );
}

/// Emit event: the submission pull request exists for `branch`.
pub fn emit_pull_request_ensured(issue: u64, pull: u64, branch: &str, created: bool) {
    info!(
        event = "pull_request.ensured",
        issue = issue,
        pull = pull,
        branch = %branch,
        created = created,
    );
}

/// Emit event: a submission branch was rebuilt on top of the base.
pub fn emit_branch_refreshed(issue: u64, branch: &str) {
    info!(event = "branch.refreshed", issue = issue, branch = %branch);
}

/// Emit event: the linked issue was closed after its pull request closed.
pub fn emit_issue_closed(issue: u64, merged: bool) {
    info!(event = "issue.closed", issue = issue, merged = merged);
}

/// Emit event: one pull request failed to resync (error level).
pub fn emit_resync_failed(pull: u64, error: &dyn std::fmt::Display) {
    tracing::error!(event = "resync.failed", pull = pull, error = %error);
}

/// Emit event: a resync batch finished.
pub fn emit_resync_finished(refreshed: usize, failed: usize) {
    info!(
        event = "resync.finished",
        refreshed = refreshed,
        failed = failed,
    );
}

/// Emit event: a best-effort step failed and was ignored.
pub fn emit_transient_failure(step: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "transient.ignored", step = %step, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_span_enter() {
        let _guard = issue_span(7).entered();
        emit_branch_refreshed(7, "publish/issue7");
    }
}
