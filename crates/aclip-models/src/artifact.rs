//! Produced media artifact records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A physical clip media file on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipArtifact {
    /// Path relative to the project's working directory
    pub path: PathBuf,

    /// Duration in seconds, as probed from the produced file
    pub duration_secs: f64,

    /// File size in bytes
    pub size_bytes: u64,

    /// When the file was produced
    pub created_at: DateTime<Utc>,
}

impl ClipArtifact {
    pub fn new(path: impl AsRef<Path>, duration_secs: f64, size_bytes: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            duration_secs,
            size_bytes,
            created_at: Utc::now(),
        }
    }
}

/// A physical concatenated collection media file on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CollectionArtifact {
    /// Path relative to the project's working directory
    pub path: PathBuf,

    /// Duration in seconds, as probed from the produced file
    pub duration_secs: f64,

    /// File size in bytes
    pub size_bytes: u64,

    /// When the file was produced
    pub created_at: DateTime<Utc>,
}

impl CollectionArtifact {
    pub fn new(path: impl AsRef<Path>, duration_secs: f64, size_bytes: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            duration_secs,
            size_bytes,
            created_at: Utc::now(),
        }
    }
}
