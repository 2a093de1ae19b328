//! pubflow - publish request reconciliation for community registries
//!
//! ## Commands
//!
//! - `run`: handle one workflow trigger (issue, pull request or push event)
//!   against the checked-out registry repository
//! - `check`: extract and validate an issue body locally and print the status
//!   comment it would receive

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pubflow_core::validate::DEFAULT_PACKAGE_INDEX;
use pubflow_core::{
    extract, render_extraction_failure, render_report, Kind, Probe, PublishConfig, Reconciler,
    RegistryPaths, RepoRef, RunOutcome, TriggerEvent, Validator,
};
use pubflow_github::{GitCli, GithubClient, HttpProbe, DEFAULT_API_URL};
use tracing::{info, warn, Level};

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "pubflow")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Publish request reconciliation for community registries", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one workflow trigger event
    Run(RunArgs),

    /// Validate an issue body locally and print the report comment
    Check {
        /// Submission kind: Plugin, Adapter or Bot
        #[arg(short, long, value_parser = parse_kind)]
        kind: Kind,

        /// Login recorded as the submission author
        #[arg(short, long)]
        author: String,

        /// Package index API root
        #[arg(long, env = "INPUT_PACKAGE_INDEX", default_value = DEFAULT_PACKAGE_INDEX)]
        package_index: String,

        /// File holding the issue body
        body: PathBuf,
    },
}

/// Inputs of a workflow run. Required values are checked after the token so
/// that a run without credentials stays a no-op.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// API token; absent or blank skips the run
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Base branch submission pull requests target
    #[arg(long, env = "INPUT_BASE")]
    base: Option<String>,

    /// Plugin registry file, relative to the workspace
    #[arg(long, env = "INPUT_PLUGIN_PATH")]
    plugin_path: Option<PathBuf>,

    /// Adapter registry file, relative to the workspace
    #[arg(long, env = "INPUT_ADAPTER_PATH")]
    adapter_path: Option<PathBuf>,

    /// Bot registry file, relative to the workspace
    #[arg(long, env = "INPUT_BOT_PATH")]
    bot_path: Option<PathBuf>,

    /// Checked-out registry repository
    #[arg(long, env = "GITHUB_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Registry repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Name of the trigger event
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: Option<String>,

    /// Path to the trigger event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    /// REST API root
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Package index API root
    #[arg(long, env = "INPUT_PACKAGE_INDEX", default_value = DEFAULT_PACKAGE_INDEX)]
    package_index: String,
}

fn parse_kind(raw: &str) -> std::result::Result<Kind, String> {
    Kind::ALL
        .into_iter()
        .find(|k| k.label().eq_ignore_ascii_case(raw.trim()))
        .ok_or_else(|| format!("unknown kind {raw:?}, expected Plugin, Adapter or Bot"))
}

fn require<T>(value: Option<T>, name: &str) -> Result<T> {
    value.with_context(|| format!("missing required input {name}"))
}

/// Process exit status for a finished run.
fn exit_status(outcome: &RunOutcome) -> u8 {
    if outcome.is_failure() {
        1
    } else {
        0
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pubflow_core::init_tracing(cli.json, level);

    let status = match cli.command {
        Commands::Run(args) => cmd_run(args).await?,
        Commands::Check {
            kind,
            author,
            package_index,
            body,
        } => {
            let probe = HttpProbe::new(PROBE_TIMEOUT).context("Failed to build HTTP client")?;
            cmd_check(Arc::new(probe), kind, &author, &package_index, &body).await?
        }
    };
    Ok(ExitCode::from(status))
}

fn load_config(args: &RunArgs) -> Result<PublishConfig> {
    let repository = RepoRef::parse(&require(args.repository.clone(), "GITHUB_REPOSITORY")?)?;
    let registry = RegistryPaths {
        plugin: require(args.plugin_path.clone(), "INPUT_PLUGIN_PATH")?,
        adapter: require(args.adapter_path.clone(), "INPUT_ADAPTER_PATH")?,
        bot: require(args.bot_path.clone(), "INPUT_BOT_PATH")?,
    };
    let workspace = require(args.workspace.clone(), "GITHUB_WORKSPACE")?;
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("Cannot resolve workspace {}", workspace.display()))?;

    let config = PublishConfig::new(
        repository,
        require(args.base.clone(), "INPUT_BASE")?,
        workspace,
        registry,
    )
    .with_package_index(args.package_index.clone());
    config.check()?;
    Ok(config)
}

fn load_event(args: &RunArgs) -> Result<TriggerEvent> {
    let name = require(args.event_name.clone(), "GITHUB_EVENT_NAME")?;
    let path = require(args.event_path.clone(), "GITHUB_EVENT_PATH")?;
    let payload = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read event payload {}", path.display()))?;
    TriggerEvent::parse(&name, &payload)
        .with_context(|| format!("Malformed {name} payload in {}", path.display()))
}

async fn cmd_run(args: RunArgs) -> Result<u8> {
    let token = match args.token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => {
            info!("no token provided, skipping run");
            return Ok(0);
        }
    };

    let config = load_config(&args)?;
    let event = load_event(&args)?;

    let platform = GithubClient::new(&args.api_url, &token, config.repository.clone())
        .context("Failed to build GitHub client")?;
    let git = GitCli::new(config.workspace.clone());
    let probe = HttpProbe::new(PROBE_TIMEOUT).context("Failed to build HTTP client")?;

    let reconciler = Reconciler::new(config, Arc::new(platform), Arc::new(git), Arc::new(probe));
    let outcome = reconciler
        .handle(&event)
        .await
        .with_context(|| format!("Failed to handle {} event", event.name()))?;

    match &outcome {
        RunOutcome::Skipped(reason) => info!(%reason, "run skipped"),
        RunOutcome::Succeeded => info!("run succeeded"),
        RunOutcome::Failed(reason) => warn!(%reason, "run failed"),
    }
    Ok(exit_status(&outcome))
}

/// Render the comment a body would receive; `(comment, passed)`.
async fn check_body(
    validator: &Validator,
    kind: Kind,
    author: &str,
    body: &str,
) -> (String, bool) {
    match extract(kind, body, author) {
        Ok(record) => {
            let report = validator.validate(&record).await;
            (render_report(&record, &report), report.pass())
        }
        Err(e) => (render_extraction_failure(&e), false),
    }
}

async fn cmd_check(
    probe: Arc<dyn Probe>,
    kind: Kind,
    author: &str,
    package_index: &str,
    body_path: &Path,
) -> Result<u8> {
    let body = std::fs::read_to_string(body_path)
        .with_context(|| format!("Failed to read issue body {}", body_path.display()))?;
    let validator = Validator::new(probe).with_package_index(package_index);

    let (comment, passed) = check_body(&validator, kind, author, &body).await;
    println!("{comment}");
    Ok(if passed { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pubflow_core::fakes::StaticProbe;

    const BOT_FORM: &str = "**机器人名称：**\nCoolQBot\n**机器人功能：**\n聊天机器人\n**机器人项目仓库/主页链接：**\nhe0119/CoolQBot";

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pubflow", "check", "--kind", "bot", "--author", "he0119", "body.md",
        ])
        .unwrap();
        match cli.command {
            Commands::Check {
                kind, author, body, ..
            } => {
                assert_eq!(kind, Kind::Bot);
                assert_eq!(author, "he0119");
                assert_eq!(body, PathBuf::from("body.md"));
            }
            Commands::Run(_) => panic!("parsed as run"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(parse_kind("Driver").is_err());
        assert_eq!(parse_kind(" Adapter ").unwrap(), Kind::Adapter);
    }

    #[test]
    fn only_failures_exit_nonzero() {
        assert_eq!(exit_status(&RunOutcome::Succeeded), 0);
        assert_eq!(exit_status(&RunOutcome::Skipped("push".to_string())), 0);
        assert_eq!(exit_status(&RunOutcome::Failed("nope".to_string())), 1);
    }

    #[tokio::test]
    async fn blank_token_is_a_no_op() {
        let args = RunArgs {
            token: Some("  ".to_string()),
            ..RunArgs::default()
        };
        assert_eq!(cmd_run(args).await.unwrap(), 0);
        assert_eq!(cmd_run(RunArgs::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_workspace_is_fatal() {
        let args = RunArgs {
            token: Some("t".to_string()),
            base: Some("master".to_string()),
            plugin_path: Some("plugins.json".into()),
            adapter_path: Some("adapters.json".into()),
            bot_path: Some("bots.json".into()),
            workspace: Some("/definitely/not/here".into()),
            repository: Some("nonebot/nonebot2".to_string()),
            ..RunArgs::default()
        };
        let err = cmd_run(args).await.unwrap_err();
        assert!(err.to_string().contains("Cannot resolve workspace"));
    }

    #[tokio::test]
    async fn check_reports_pass_and_failure() {
        let passing = Validator::new(Arc::new(StaticProbe::new().with_default(200)));
        let (comment, passed) = check_body(&passing, Kind::Bot, "he0119", BOT_FORM).await;
        assert!(passed);
        assert!(comment.contains("CoolQBot"));

        let failing = Validator::new(Arc::new(StaticProbe::new().with_default(404)));
        let (_, passed) = check_body(&failing, Kind::Bot, "he0119", BOT_FORM).await;
        assert!(!passed);

        let (comment, passed) = check_body(&passing, Kind::Bot, "he0119", "nothing here").await;
        assert!(!passed);
        assert!(comment.contains("`name`"));
    }

    #[tokio::test]
    async fn check_reads_the_body_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.md");
        std::fs::write(&path, BOT_FORM).unwrap();
        let probe: Arc<dyn Probe> = Arc::new(StaticProbe::new().with_default(200));

        let status = cmd_check(probe.clone(), Kind::Bot, "he0119", DEFAULT_PACKAGE_INDEX, &path)
            .await
            .unwrap();
        assert_eq!(status, 0);

        let missing = dir.path().join("missing.md");
        assert!(cmd_check(probe, Kind::Bot, "he0119", DEFAULT_PACKAGE_INDEX, &missing)
            .await
            .is_err());
    }
}
