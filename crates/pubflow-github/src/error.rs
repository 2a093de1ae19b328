//! Error types for pubflow-github

use thiserror::Error;

/// Errors raised while constructing the production collaborators.
///
/// Failures of individual calls are reported through the port error types
/// (`PlatformError`, `GitError`) so the reconciler can classify them.
#[derive(Error, Debug)]
pub enum GithubError {
    /// The token cannot be carried in an HTTP header
    #[error("access token contains characters not allowed in a header")]
    InvalidToken,

    /// The HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::Client(err.to_string())
    }
}

/// Result type for collaborator construction
pub type Result<T> = std::result::Result<T, GithubError>;
