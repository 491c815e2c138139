//! Per-project directory layout.
//!
//! ```text
//! <root>/<project_id>/
//!   input/   input.mp4, input.srt
//!   output/
//!     clips/         <clip_id>.mp4 (+ .jpg thumbnail)
//!     collections/   <collection_id>.mp4
//!     metadata/      project_metadata.json, stage{1..5}_result.json,
//!                    clips_metadata.json, collections_metadata.json
//!   logs/
//!   temp/
//! ```

use std::path::{Path, PathBuf};

use aclip_models::StageId;

use crate::error::StoreResult;

/// Resolver for every well-known file in a project's working directory.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(store_root: impl AsRef<Path>, project_id: &str) -> Self {
        Self {
            root: store_root.as_ref().join(project_id),
        }
    }

    /// Wrap an existing project working directory.
    pub fn from_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            root: workdir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    pub fn input_video(&self) -> PathBuf {
        self.input_dir().join("input.mp4")
    }

    pub fn input_srt(&self) -> PathBuf {
        self.input_dir().join("input.srt")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.output_dir().join("clips")
    }

    pub fn clip_video(&self, clip_id: &str) -> PathBuf {
        self.clips_dir().join(format!("{}.mp4", clip_id))
    }

    pub fn clip_thumbnail(&self, clip_id: &str) -> PathBuf {
        self.clips_dir().join(format!("{}.jpg", clip_id))
    }

    pub fn collections_dir(&self) -> PathBuf {
        self.output_dir().join("collections")
    }

    pub fn collection_video(&self, collection_id: &str) -> PathBuf {
        self.collections_dir().join(format!("{}.mp4", collection_id))
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.output_dir().join("metadata")
    }

    pub fn project_metadata(&self) -> PathBuf {
        self.metadata_dir().join("project_metadata.json")
    }

    /// Stage result file for stages 1-5; `None` for stage 6.
    pub fn stage_result(&self, stage: StageId) -> Option<PathBuf> {
        stage
            .result_filename()
            .map(|name| self.metadata_dir().join(name))
    }

    pub fn clips_metadata(&self) -> PathBuf {
        self.metadata_dir().join("clips_metadata.json")
    }

    pub fn collections_metadata(&self) -> PathBuf {
        self.metadata_dir().join("collections_metadata.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn pipeline_log(&self) -> PathBuf {
        self.logs_dir().join("pipeline.log")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Create the full directory skeleton.
    pub async fn ensure_layout(&self) -> StoreResult<()> {
        for dir in [
            self.input_dir(),
            self.clips_dir(),
            self.collections_dir(),
            self.metadata_dir(),
            self.logs_dir(),
            self.temp_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}
