//! Production collaborators for pubflow
//!
//! - `GithubClient`: GitHub REST API implementation of `Platform`
//! - `HttpProbe`: reqwest-backed reachability `Probe`
//! - `GitCli`: `git` subprocess implementation of `GitPort`

pub mod client;
pub mod error;
pub mod git;
pub mod probe;

pub use client::{GithubClient, DEFAULT_API_URL};
pub use error::{GithubError, Result};
pub use git::GitCli;
pub use probe::HttpProbe;
