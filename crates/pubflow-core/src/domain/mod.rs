//! Domain model for publish requests.
//!
//! - `Kind`: the three submission categories
//! - `SubmissionRecord`: a typed record extracted from an issue body
//! - `RegistryEntry`: the record as stored in a registry file
//! - `TriggerEvent`: inbound platform events

pub mod error;
pub mod event;
pub mod kind;
pub mod record;

pub use error::{ExtractionError, GitError, PlatformError, PubflowError, Result};
pub use event::{
    IssueAction, IssuesEvent, PullRequestAction, PullRequestEvent, PushEvent, TriggerEvent,
};
pub use kind::Kind;
pub use record::{AdapterRecord, BotRecord, PluginRecord, RegistryEntry, SubmissionRecord};
