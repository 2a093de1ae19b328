//! External reachability checks for a submission.
//!
//! A failed check is not an error: it is a `false` in the returned
//! [`ValidationReport`]. Transport failures surface the same way, with no
//! status code attached.

use std::sync::Arc;

use crate::domain::SubmissionRecord;
use crate::obs;
use crate::ports::Probe;

/// Default package index JSON API root.
pub const DEFAULT_PACKAGE_INDEX: &str = "https://pypi.org/pypi";

/// Host that `owner/name` shorthand resolves against.
pub const DEFAULT_REPO_HOST: &str = "https://github.com";

/// Outcome of one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    /// `None` when the request never produced a response.
    pub status: Option<u16>,
}

impl ProbeResult {
    pub fn ok(&self) -> bool {
        self.status == Some(200)
    }
}

/// Per-check breakdown for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub repo: ProbeResult,
    /// Package-index lookup; `None` for kinds without a package.
    pub package: Option<ProbeResult>,
}

impl ValidationReport {
    pub fn repo_reachable(&self) -> bool {
        self.repo.ok()
    }

    /// Always `true` when the kind has no package.
    pub fn package_published(&self) -> bool {
        self.package.as_ref().map_or(true, ProbeResult::ok)
    }

    pub fn pass(&self) -> bool {
        self.repo_reachable() && self.package_published()
    }
}

/// Resolve `owner/name` shorthand to a URL; absolute URLs pass through.
pub fn resolve_repo_url(repo: &str, host: &str) -> String {
    let repo = repo.trim();
    if repo.contains("://") {
        repo.to_string()
    } else {
        format!(
            "{}/{}",
            host.trim_end_matches('/'),
            repo.trim_matches('/')
        )
    }
}

/// Runs the repository and package checks through a [`Probe`].
#[derive(Clone)]
pub struct Validator {
    probe: Arc<dyn Probe>,
    package_index: String,
    repo_host: String,
}

impl Validator {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            package_index: DEFAULT_PACKAGE_INDEX.to_string(),
            repo_host: DEFAULT_REPO_HOST.to_string(),
        }
    }

    pub fn with_package_index(mut self, package_index: impl Into<String>) -> Self {
        self.package_index = package_index.into();
        self
    }

    pub fn with_repo_host(mut self, repo_host: impl Into<String>) -> Self {
        self.repo_host = repo_host.into();
        self
    }

    /// JSON endpoint for a distribution on the package index.
    pub fn package_url(&self, package_link: &str) -> String {
        format!(
            "{}/{}/json",
            self.package_index.trim_end_matches('/'),
            package_link
        )
    }

    pub fn repo_url(&self, repo: &str) -> String {
        resolve_repo_url(repo, &self.repo_host)
    }

    pub async fn validate(&self, record: &SubmissionRecord) -> ValidationReport {
        let repo = self.check(self.repo_url(record.repo())).await;

        let package = match record.package_link() {
            Some(link) if record.kind().has_package() => {
                Some(self.check(self.package_url(link)).await)
            }
            _ => None,
        };

        let report = ValidationReport { repo, package };
        obs::emit_submission_validated(
            record.kind(),
            record.display_name(),
            report.repo_reachable(),
            report.package_published(),
        );
        report
    }

    async fn check(&self, url: String) -> ProbeResult {
        let status = self.probe.status(&url).await;
        tracing::debug!(url = %url, status = ?status, "probe finished");
        ProbeResult { url, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_resolves_against_host() {
        assert_eq!(
            resolve_repo_url("nonebot/nonebot2", DEFAULT_REPO_HOST),
            "https://github.com/nonebot/nonebot2"
        );
        assert_eq!(
            resolve_repo_url("https://v2.nonebot.dev", DEFAULT_REPO_HOST),
            "https://v2.nonebot.dev"
        );
        assert_eq!(
            resolve_repo_url(" /a/b/ ", "http://127.0.0.1:9000/"),
            "http://127.0.0.1:9000/a/b"
        );
    }

    #[test]
    fn report_without_package_only_needs_repo() {
        let report = ValidationReport {
            repo: ProbeResult {
                url: "https://github.com/a/b".to_string(),
                status: Some(200),
            },
            package: None,
        };
        assert!(report.package_published());
        assert!(report.pass());
    }

    #[test]
    fn transport_failure_is_not_reachable() {
        let report = ValidationReport {
            repo: ProbeResult {
                url: "https://github.com/a/b".to_string(),
                status: None,
            },
            package: Some(ProbeResult {
                url: "https://pypi.org/pypi/x/json".to_string(),
                status: Some(200),
            }),
        };
        assert!(!report.repo_reachable());
        assert!(report.package_published());
        assert!(!report.pass());
    }
}
