//! The project store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aclip_models::{
    ClipsMetadata, CollectionsMetadata, Project, ProjectId, ProjectSummary, StageId, StageResult,
    VideoCategory,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::atomic::write_json_atomic;
use crate::error::{StoreError, StoreResult};
use crate::index::ProjectIndex;
use crate::logs::ProjectLog;
use crate::paths::ProjectPaths;

/// Store over a root directory holding one subdirectory per project plus the
/// global `projects.json` index.
pub struct ProjectStore {
    root: PathBuf,
    index: Mutex<ProjectIndex>,
    // Per-project mutation locks, created lazily and never removed while the
    // process runs; the map itself is guarded by a std mutex held briefly.
    project_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectStore {
    /// Open (or initialize) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let index = ProjectIndex::load(root.join("projects.json")).await?;
        info!(root = %root.display(), projects = index.summaries().len(), "project store opened");

        Ok(Self {
            root,
            index: Mutex::new(index),
            project_locks: std::sync::Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path resolver for a project.
    pub fn paths(&self, id: &ProjectId) -> ProjectPaths {
        ProjectPaths::new(&self.root, id.as_str())
    }

    /// Log handle for a project.
    pub fn log(&self, id: &ProjectId) -> ProjectLog {
        ProjectLog::new(self.paths(id).pipeline_log())
    }

    /// Acquire the per-project mutation lock. Held for the duration of a
    /// same-project mutation; never across an LLM call or transcode.
    pub async fn lock_project(&self, id: &ProjectId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.project_locks.lock().expect("project lock map poisoned");
            locks
                .entry(id.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Create a new project: directory skeleton, metadata file, index entry.
    pub async fn create_project(
        &self,
        name: impl Into<String>,
        category: VideoCategory,
    ) -> StoreResult<Project> {
        let mut project = Project::new(name, category, PathBuf::new());
        project.workdir = self.root.join(project.id.as_str());

        let paths = self.paths(&project.id);
        paths.ensure_layout().await?;
        write_json_atomic(paths.project_metadata(), &project).await?;

        self.index.lock().await.upsert(project.summary()).await?;
        info!(project_id = %project.id, name = %project.name, "project created");

        Ok(project)
    }

    /// Persist a project's metadata and refresh its index entry.
    pub async fn save_project(&self, project: &Project) -> StoreResult<()> {
        let paths = self.paths(&project.id);
        write_json_atomic(paths.project_metadata(), project).await?;
        self.index.lock().await.upsert(project.summary()).await
    }

    /// Load a project's full metadata.
    pub async fn load_project(&self, id: &ProjectId) -> StoreResult<Project> {
        let path = self.paths(id).project_metadata();
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::ProjectNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::corrupt(path, e.to_string()))
    }

    /// All project summaries, newest first.
    pub async fn list_projects(&self) -> Vec<ProjectSummary> {
        let index = self.index.lock().await;
        let mut summaries = index.summaries().to_vec();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Whether a project exists in the index.
    pub async fn exists(&self, id: &ProjectId) -> bool {
        self.index.lock().await.get(id).is_some()
    }

    /// Delete a project: working directory first, then the index entry. Both
    /// best-effort; a missing directory is not an error.
    pub async fn delete_project(&self, id: &ProjectId) -> StoreResult<bool> {
        let paths = self.paths(id);
        match tokio::fs::remove_dir_all(paths.root()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(project_id = %id, "failed to remove project directory: {}", e),
        }

        let removed = self.index.lock().await.remove(id).await?;
        if removed {
            info!(project_id = %id, "project deleted");
        }
        Ok(removed)
    }

    /// Persist a stage's output file atomically.
    pub async fn write_stage_result<R: StageResult>(
        &self,
        id: &ProjectId,
        result: &R,
    ) -> StoreResult<()> {
        let path = self
            .paths(id)
            .stage_result(R::STAGE)
            .expect("stage 6 persists no stage result file");
        write_json_atomic(&path, result).await
    }

    /// Load a stage's output file.
    pub async fn read_stage_result<R: StageResult>(&self, id: &ProjectId) -> StoreResult<R> {
        let path = self
            .paths(id)
            .stage_result(R::STAGE)
            .expect("stage 6 persists no stage result file");
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::MetadataMissing(path))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(path, e.to_string()))
    }

    /// Whether a stage's output file exists on disk.
    pub async fn stage_result_exists(&self, id: &ProjectId, stage: StageId) -> bool {
        match self.paths(id).stage_result(stage) {
            Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            // Stage 6 is judged by its metadata files.
            None => {
                tokio::fs::try_exists(self.paths(id).clips_metadata())
                    .await
                    .unwrap_or(false)
            }
        }
    }

    /// Remove a stage's output file if present (cancel cleanup).
    pub async fn remove_stage_result(&self, id: &ProjectId, stage: StageId) -> StoreResult<()> {
        if let Some(path) = self.paths(id).stage_result(stage) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Load `clips_metadata.json`; absent reads as empty.
    pub async fn read_clips_metadata(&self, id: &ProjectId) -> StoreResult<ClipsMetadata> {
        self.read_optional_json(self.paths(id).clips_metadata()).await
    }

    pub async fn write_clips_metadata(
        &self,
        id: &ProjectId,
        meta: &ClipsMetadata,
    ) -> StoreResult<()> {
        write_json_atomic(self.paths(id).clips_metadata(), meta).await
    }

    /// Load `collections_metadata.json`; absent reads as empty.
    pub async fn read_collections_metadata(
        &self,
        id: &ProjectId,
    ) -> StoreResult<CollectionsMetadata> {
        self.read_optional_json(self.paths(id).collections_metadata())
            .await
    }

    pub async fn write_collections_metadata(
        &self,
        id: &ProjectId,
        meta: &CollectionsMetadata,
    ) -> StoreResult<()> {
        write_json_atomic(self.paths(id).collections_metadata(), meta).await
    }

    async fn read_optional_json<T: serde::de::DeserializeOwned + Default>(
        &self,
        path: PathBuf,
    ) -> StoreResult<T> {
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(path, e.to_string()))
    }
}
