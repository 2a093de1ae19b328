//! Explicit run configuration handed to every component.

use std::path::PathBuf;

use crate::domain::{Kind, PubflowError, Result};
use crate::validate::{DEFAULT_PACKAGE_INDEX, DEFAULT_REPO_HOST};

/// `owner/name` of the registry repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.trim().splitn(2, '/');
        let owner = parts.next().unwrap_or_default().trim();
        let name = parts.next().unwrap_or_default().trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(PubflowError::Config(format!(
                "repository must be owner/name, got {raw:?}"
            )));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Registry file locations, relative to the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryPaths {
    pub plugin: PathBuf,
    pub adapter: PathBuf,
    pub bot: PathBuf,
}

impl RegistryPaths {
    pub fn for_kind(&self, kind: Kind) -> &PathBuf {
        match kind {
            Kind::Plugin => &self.plugin,
            Kind::Adapter => &self.adapter,
            Kind::Bot => &self.bot,
        }
    }
}

/// Everything a run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub repository: RepoRef,
    /// Base branch the submission pull requests target.
    pub base: String,
    /// Checked-out working tree of the registry repository.
    pub workspace: PathBuf,
    pub registry: RegistryPaths,
    pub package_index: String,
    pub repo_host: String,
}

impl PublishConfig {
    pub fn new(
        repository: RepoRef,
        base: impl Into<String>,
        workspace: impl Into<PathBuf>,
        registry: RegistryPaths,
    ) -> Self {
        Self {
            repository,
            base: base.into(),
            workspace: workspace.into(),
            registry,
            package_index: DEFAULT_PACKAGE_INDEX.to_string(),
            repo_host: DEFAULT_REPO_HOST.to_string(),
        }
    }

    pub fn with_package_index(mut self, package_index: impl Into<String>) -> Self {
        self.package_index = package_index.into();
        self
    }

    /// Reject values no run could succeed with.
    pub fn check(&self) -> Result<()> {
        if self.base.trim().is_empty() {
            return Err(PubflowError::Config("base branch is empty".to_string()));
        }
        if !self.workspace.is_dir() {
            return Err(PubflowError::Config(format!(
                "workspace {} is not a directory",
                self.workspace.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_parses_owner_and_name() {
        let repo = RepoRef::parse("nonebot/nonebot2").unwrap();
        assert_eq!(repo.owner, "nonebot");
        assert_eq!(repo.name, "nonebot2");
        assert_eq!(repo.to_string(), "nonebot/nonebot2");
    }

    #[test]
    fn repo_ref_rejects_malformed() {
        for raw in ["", "nonebot", "/x", "a/b/c", "a/"] {
            assert!(
                matches!(RepoRef::parse(raw), Err(PubflowError::Config(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn check_requires_existing_workspace() {
        let paths = RegistryPaths {
            plugin: "plugins.json".into(),
            adapter: "adapters.json".into(),
            bot: "bots.json".into(),
        };
        let missing = PublishConfig::new(
            RepoRef::parse("a/b").unwrap(),
            "master",
            "/definitely/not/here",
            paths.clone(),
        );
        assert!(missing.check().unwrap_err().is_run_fatal());

        let dir = tempfile::tempdir().unwrap();
        let ok = PublishConfig::new(RepoRef::parse("a/b").unwrap(), "master", dir.path(), paths);
        assert!(ok.check().is_ok());
        assert_eq!(ok.package_index, DEFAULT_PACKAGE_INDEX);
    }
}
