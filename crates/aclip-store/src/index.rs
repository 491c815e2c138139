//! The global `projects.json` index.

use std::path::{Path, PathBuf};

use aclip_models::{ProjectId, ProjectSummary};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::atomic::write_json_atomic;
use crate::error::StoreResult;

/// Serialized form of the index file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexFile {
    projects: Vec<ProjectSummary>,
}

/// In-memory copy of `projects.json`. Callers hold the store's index lock
/// across load-modify-save sequences.
#[derive(Debug)]
pub(crate) struct ProjectIndex {
    path: PathBuf,
    projects: Vec<ProjectSummary>,
}

impl ProjectIndex {
    /// Load the index from disk, starting empty when the file is absent. A
    /// corrupt index is replaced rather than taking the service down.
    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let projects = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<IndexFile>(&bytes) {
                Ok(file) => file.projects,
                Err(e) => {
                    warn!(path = %path.display(), "projects.json is corrupt, starting fresh: {}", e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, projects })
    }

    pub fn summaries(&self) -> &[ProjectSummary] {
        &self.projects
    }

    pub fn get(&self, id: &ProjectId) -> Option<&ProjectSummary> {
        self.projects.iter().find(|p| &p.id == id)
    }

    /// Insert or replace a summary, then persist.
    pub async fn upsert(&mut self, summary: ProjectSummary) -> StoreResult<()> {
        match self.projects.iter_mut().find(|p| p.id == summary.id) {
            Some(existing) => *existing = summary,
            None => self.projects.push(summary),
        }
        self.save().await
    }

    /// Remove a summary, then persist. Returns whether it was present.
    pub async fn remove(&mut self, id: &ProjectId) -> StoreResult<bool> {
        let before = self.projects.len();
        self.projects.retain(|p| &p.id != id);
        let removed = self.projects.len() != before;
        if removed {
            self.save().await?;
        }
        Ok(removed)
    }

    async fn save(&self) -> StoreResult<()> {
        let file = IndexFile {
            projects: self.projects.clone(),
        };
        write_json_atomic(&self.path, &file).await
    }
}
