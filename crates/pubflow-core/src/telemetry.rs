//! Tracing setup for `pubflow` runs.
//!
//! A run is one workflow job: its log is read in the job console (plain
//! text) or shipped to a collector (`--json`). Either way the lifecycle
//! events from [`crate::obs`] are the lines that matter, so the HTTP stack
//! underneath the GitHub client and the probes is held at `warn` unless
//! `RUST_LOG` says otherwise.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const QUIET_TARGETS: [&str; 3] = ["hyper", "reqwest", "rustls"];

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(level: Level) -> String {
    let mut directives = vec![level.as_str().to_lowercase()];
    directives.extend(QUIET_TARGETS.iter().map(|t| format!("{t}=warn")));
    directives.join(",")
}

/// Install the global subscriber, writing to stderr.
///
/// stdout is reserved for command output such as the report printed by
/// `pubflow check`. Only the first call in a process takes effect, which
/// lets tests call this freely.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
