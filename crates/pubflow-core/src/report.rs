//! Status comment rendering and the singleton comment thread.
//!
//! Every bot-authored status comment starts with [`TITLE_MARKER`]; the
//! [`Reporter`] edits the first such comment in place instead of posting a
//! second one.

use std::sync::Arc;

use crate::domain::{ExtractionError, Kind, PlatformError, SubmissionRecord};
use crate::ports::{Comment, Platform};
use crate::validate::{ProbeResult, ValidationReport};

/// First line of every status comment.
pub const TITLE_MARKER: &str = "# 📃 Publish Check Result";

/// Appended when an existing comment is rewritten.
pub const REUSE_NOTICE: &str = "♻️ This comment has been updated with the latest result.";

pub const FOOTER: &str = "💪 Powered by pubflow";

/// Comment body for a validation report.
pub fn render_report(record: &SubmissionRecord, report: &ValidationReport) -> String {
    let mut out = format!("{TITLE_MARKER}\n\n> {}\n\n", record.title());

    if report.pass() {
        out.push_str("**✅ All checks passed. The registry pull request is up to date.**\n");
    } else {
        out.push_str("**⚠️ Some checks failed. Edit the issue to trigger a new check.**\n");
    }

    out.push_str("\n<details>\n<summary>Details</summary>\n\n");
    out.push_str(&repo_line(&report.repo));
    match (&report.package, record.package_link()) {
        (Some(package), Some(link)) => out.push_str(&package_line(package, link)),
        _ => out.push_str("- ➖ No package to check for this submission kind.\n"),
    }
    out.push_str("\n</details>");
    out
}

fn repo_line(repo: &ProbeResult) -> String {
    match repo.status {
        Some(200) => format!("- ✅ Project [homepage]({}) returned status 200.\n", repo.url),
        Some(status) => format!(
            "- ⚠️ Project [homepage]({}) returned status {status}. Make sure the repository is public and the link is correct.\n",
            repo.url
        ),
        None => format!(
            "- ⚠️ Project [homepage]({}) could not be reached. Make sure the repository is public and the link is correct.\n",
            repo.url
        ),
    }
}

fn package_line(package: &ProbeResult, link: &str) -> String {
    if package.ok() {
        format!("- ✅ Package `{link}` is published on the package index.\n")
    } else {
        format!(
            "- ⚠️ Package `{link}` is not available on the package index ({}). Publish the package before submitting.\n",
            package.url
        )
    }
}

/// Human-readable name of a field key.
fn field_label(key: &str) -> &'static str {
    match key {
        "id" => "import name",
        "link" => "install name",
        "name" => "name",
        "desc" => "description",
        "repo" => "repository / homepage link",
        _ => "unknown field",
    }
}

/// Comment body for an issue whose body could not be extracted.
pub fn render_extraction_failure(error: &ExtractionError) -> String {
    let mut out = format!(
        "{TITLE_MARKER}\n\n> {}\n\n**⚠️ The issue body is incomplete.**\n\nMissing fields:\n\n",
        kind_heading(error.kind)
    );
    for key in &error.missing {
        out.push_str(&format!("- {} (`{key}`)\n", field_label(key)));
    }
    out.push_str("\nFill in every field of the issue form and save the issue to trigger a new check.");
    out
}

fn kind_heading(kind: Kind) -> String {
    format!("{kind} submission")
}

/// Full comment text: body, separator and footer, with the reuse notice when
/// an existing comment is rewritten.
pub fn finish_comment(body: &str, reused: bool) -> String {
    if reused {
        format!("{body}\n\n---\n\n{REUSE_NOTICE}\n\n{FOOTER}\n")
    } else {
        format!("{body}\n\n---\n\n{FOOTER}\n")
    }
}

/// First status comment in `comments`.
pub fn find_status_comment(comments: &[Comment]) -> Option<&Comment> {
    comments.iter().find(|c| c.body.starts_with(TITLE_MARKER))
}

/// Maintains the single status comment of an issue.
#[derive(Clone)]
pub struct Reporter {
    platform: Arc<dyn Platform>,
}

impl Reporter {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Post or refresh the validation report for `issue`.
    pub async fn publish(
        &self,
        issue: u64,
        report: &ValidationReport,
        record: &SubmissionRecord,
    ) -> Result<(), PlatformError> {
        self.upsert(issue, &render_report(record, report)).await
    }

    pub async fn publish_extraction_error(
        &self,
        issue: u64,
        error: &ExtractionError,
    ) -> Result<(), PlatformError> {
        self.upsert(issue, &render_extraction_failure(error)).await
    }

    /// Find-or-create on the title marker.
    pub async fn upsert(&self, issue: u64, body: &str) -> Result<(), PlatformError> {
        let comments = self.platform.list_comments(issue).await?;
        match find_status_comment(&comments) {
            Some(existing) => {
                tracing::info!(issue, comment = existing.id, "updating status comment");
                self.platform
                    .update_comment(existing.id, &finish_comment(body, true))
                    .await
            }
            None => {
                let created = self
                    .platform
                    .create_comment(issue, &finish_comment(body, false))
                    .await?;
                tracing::info!(issue, comment = created.id, "status comment created");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PluginRecord;

    fn record() -> SubmissionRecord {
        SubmissionRecord::Plugin(PluginRecord {
            import_id: "nonebot_plugin_example".to_string(),
            package_link: "nonebot-plugin-example".to_string(),
            display_name: "复读机".to_string(),
            description: "复读群友的消息".to_string(),
            author: "test".to_string(),
            repo: "nonebot/nonebot2".to_string(),
        })
    }

    fn probe(url: &str, status: Option<u16>) -> ProbeResult {
        ProbeResult {
            url: url.to_string(),
            status,
        }
    }

    #[test]
    fn failing_package_is_named() {
        let report = ValidationReport {
            repo: probe("https://github.com/nonebot/nonebot2", Some(200)),
            package: Some(probe(
                "https://pypi.org/pypi/nonebot-plugin-example/json",
                Some(404),
            )),
        };
        let body = render_report(&record(), &report);
        assert!(body.starts_with(TITLE_MARKER));
        assert!(body.contains("> Plugin: 复读机"));
        assert!(body.contains("Some checks failed"));
        assert!(body.contains("Package `nonebot-plugin-example` is not available"));
        assert!(body.contains("✅ Project [homepage](https://github.com/nonebot/nonebot2)"));
    }

    #[test]
    fn unreachable_repo_has_remediation() {
        let report = ValidationReport {
            repo: probe("https://github.com/a/b", None),
            package: None,
        };
        let body = render_report(&record(), &report);
        assert!(body.contains("could not be reached"));
        assert!(body.contains("repository is public"));
    }

    #[test]
    fn extraction_failure_lists_fields() {
        let body = render_extraction_failure(&ExtractionError {
            kind: Kind::Adapter,
            missing: vec!["link", "repo"],
        });
        assert!(body.starts_with(TITLE_MARKER));
        assert!(body.contains("- install name (`link`)"));
        assert!(body.contains("- repository / homepage link (`repo`)"));
    }

    #[test]
    fn reuse_notice_only_on_rewrite() {
        assert!(!finish_comment("x", false).contains(REUSE_NOTICE));
        let reused = finish_comment("x", true);
        assert!(reused.contains(REUSE_NOTICE));
        assert!(reused.trim_end().ends_with(FOOTER));
    }
}
