//! Registry mutator: appends entries to the per-kind JSON array files.
//!
//! A missing or unparsable registry file is run-fatal, never skipped.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::RegistryPaths;
use crate::domain::{Kind, PubflowError, RegistryEntry, Result, SubmissionRecord};

/// Read-modify-write access to the registry files of one workspace.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    workspace: PathBuf,
    paths: RegistryPaths,
}

impl RegistryStore {
    pub fn new(workspace: impl Into<PathBuf>, paths: RegistryPaths) -> Self {
        Self {
            workspace: workspace.into(),
            paths,
        }
    }

    /// Absolute path of the registry file for `kind`.
    pub fn path_for(&self, kind: Kind) -> Result<PathBuf> {
        let path = self.workspace.join(self.paths.for_kind(kind));
        if !path.is_file() {
            return Err(PubflowError::Config(format!(
                "registry file for {kind} not found at {}",
                path.display()
            )));
        }
        Ok(path)
    }

    /// Append `record` to its kind's file and return the written content.
    pub fn append(&self, record: &SubmissionRecord) -> Result<String> {
        self.append_entry(record.kind(), &record.to_entry())
    }

    pub fn append_entry(&self, kind: Kind, entry: &RegistryEntry) -> Result<String> {
        let path = self.path_for(kind)?;
        let mut entries = read_array(&path)?;
        entries.push(serde_json::to_value(entry)?);

        let mut content = serde_json::to_string_pretty(&Value::Array(entries))?;
        content.push('\n');
        std::fs::write(&path, &content)?;

        tracing::info!(path = %path.display(), kind = %kind, name = %entry.name, "registry entry appended");
        Ok(content)
    }

    /// Current entries of `kind`'s file.
    pub fn entries(&self, kind: Kind) -> Result<Vec<RegistryEntry>> {
        let path = self.path_for(kind)?;
        read_array(&path)?
            .into_iter()
            .map(|v| {
                serde_json::from_value(v).map_err(|e| PubflowError::CorruptRegistry {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

fn read_array(path: &Path) -> Result<Vec<Value>> {
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => Ok(entries),
        Ok(_) => Err(PubflowError::CorruptRegistry {
            path: path.to_path_buf(),
            reason: "top-level value is not an array".to_string(),
        }),
        Err(e) => Err(PubflowError::CorruptRegistry {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
