//! Error taxonomy for the reconciliation engine.
//!
//! Only [`PubflowError`] crosses the reconciler boundary. Validation failures
//! are not errors at all: they live as `false` fields of a report.

use std::path::PathBuf;

use super::kind::Kind;

/// The issue body did not yield a complete record for its kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot extract {kind} submission, missing: {}", missing.join(", "))]
pub struct ExtractionError {
    pub kind: Kind,
    /// Field keys (`id`, `link`, `name`, `desc`, `repo`) that were absent.
    pub missing: Vec<&'static str>,
}

/// Failures reported by the hosting platform collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The resource already exists (e.g. a pull request for the same head).
    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{operation} failed with status {status}: {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// A git invocation exited unsuccessfully or could not be spawned.
#[derive(Debug, Clone, thiserror::Error)]
#[error("git {command} failed: {message}")]
pub struct GitError {
    pub command: String,
    pub message: String,
}

impl GitError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Engine-level errors.
#[derive(Debug, thiserror::Error)]
pub enum PubflowError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("registry file {} is corrupt: {reason}", path.display())]
    CorruptRegistry { path: PathBuf, reason: String },

    #[error("branch {0} does not name an issue")]
    UnlinkedBranch(String),

    #[error("issue #{0} carries no submission kind")]
    Unclassified(u64),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PubflowError {
    /// Configuration and registry-integrity failures abort the whole run even
    /// inside a batch.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            PubflowError::Config(_) | PubflowError::CorruptRegistry { .. } | PubflowError::Io(_)
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PubflowError>;
