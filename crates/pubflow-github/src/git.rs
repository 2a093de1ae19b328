//! git CLI implementation of the [`GitPort`] port.
//!
//! Every command runs in the configured work tree. Author identity is passed
//! per commit with `-c`, so no repository or global config is modified.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pubflow_core::ports::{CommitAuthor, GitPort, GitResult};
use pubflow_core::GitError;
use tokio::process::Command;
use tracing::debug;

/// Runs `git` in a work tree, pushing to one remote.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    remote: String,
}

impl GitCli {
    /// Work tree at `workdir`, pushing to `origin`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: "origin".to_string(),
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git <args>`; `name` labels the command in errors.
    async fn run(&self, name: &str, args: &[&str]) -> GitResult<String> {
        debug!(command = name, ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .await
            .map_err(|e| GitError::new(name, format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::new(name, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !stdout.is_empty() {
            debug!(command = name, %stdout, "git output");
        }
        Ok(stdout)
    }
}

#[async_trait]
impl GitPort for GitCli {
    async fn switch_create(&self, branch: &str) -> GitResult<()> {
        self.run("switch", &["switch", "-C", branch]).await?;
        Ok(())
    }

    async fn reset_hard(&self, target: &str) -> GitResult<()> {
        self.run("reset", &["reset", "--hard", target]).await?;
        Ok(())
    }

    async fn add_all(&self) -> GitResult<()> {
        self.run("add", &["add", "-A"]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str, author: &CommitAuthor) -> GitResult<()> {
        let name = format!("user.name={}", author.name);
        let email = format!("user.email={}", author.email);
        self.run(
            "commit",
            &["-c", &name, "-c", &email, "commit", "-m", message],
        )
        .await?;
        Ok(())
    }

    async fn push(&self, branch: &str, force: bool) -> GitResult<()> {
        let mut args = vec!["push", self.remote.as_str(), branch];
        if force {
            args.push("--force");
        }
        self.run("push", &args).await?;
        Ok(())
    }

    async fn delete_remote_branch(&self, branch: &str) -> GitResult<()> {
        self.run("push", &["push", self.remote.as_str(), "--delete", branch])
            .await?;
        Ok(())
    }
}
