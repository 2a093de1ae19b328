//! pubflow core library
//!
//! Publish-request reconciliation: turns issue bodies into typed submission
//! records, validates them, appends them to the registry files and keeps one
//! pull request per issue in sync with the base branch.

pub mod classify;
pub mod config;
pub mod domain;
pub mod extract;
pub mod fakes;
pub mod obs;
pub mod ports;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod telemetry;
pub mod validate;

pub use classify::{
    branch_name, by_commit_message, by_labels, by_title, commit_message, issue_number_from_ref,
    PUBLISH_MARKER,
};
pub use config::{PublishConfig, RegistryPaths, RepoRef};
pub use domain::{
    AdapterRecord, BotRecord, ExtractionError, GitError, Kind, PlatformError, PluginRecord,
    PubflowError, RegistryEntry, Result, SubmissionRecord, TriggerEvent,
};
pub use extract::{
    extract, extract_for_resync, extract_with, render_block, render_form, upsert_block, Grammar,
};
pub use ports::{
    CloseReason, Comment, CommitAuthor, GitPort, Issue, IssueState, NewPullRequest, Platform,
    Probe, PullRequest,
};
pub use reconcile::{Reconciler, ResyncSummary, RunOutcome};
pub use registry::RegistryStore;
pub use report::{render_extraction_failure, render_report, Reporter, TITLE_MARKER};
pub use telemetry::init_tracing;
pub use validate::{resolve_repo_url, ProbeResult, ValidationReport, Validator};

/// pubflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
