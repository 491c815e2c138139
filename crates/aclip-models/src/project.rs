//! Project lifecycle models.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::VideoCategory;

/// Number of pipeline stages a project passes through.
pub const TOTAL_STAGES: u8 = 6;

/// Unique identifier for a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Generate a new random project ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle state of a project.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Input files are being written
    #[default]
    Uploading,
    /// Pipeline is running
    Processing,
    /// All six stages finished
    Completed,
    /// Pipeline halted at a stage
    Error,
    /// Cancelled by the user
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Uploading => "uploading",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the project can accept a new pipeline run.
    pub fn is_idle(&self) -> bool {
        !matches!(self, ProjectStatus::Processing | ProjectStatus::Uploading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Completed | ProjectStatus::Error | ProjectStatus::Cancelled
        )
    }
}

/// The top-level unit of work: one source video plus everything derived
/// from it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    /// Unique project ID
    pub id: ProjectId,

    /// Human-readable name
    pub name: String,

    /// Content category, selects prompt variants
    #[serde(default)]
    pub category: VideoCategory,

    /// Lifecycle state
    #[serde(default)]
    pub status: ProjectStatus,

    /// Stage currently running or last reached (1..=6)
    #[serde(default = "default_stage")]
    pub current_stage: u8,

    /// Total number of stages
    #[serde(default = "default_total_stages")]
    pub total_stages: u8,

    /// Error description when status is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Working directory holding input/, output/, logs/, temp/
    pub workdir: PathBuf,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

fn default_stage() -> u8 {
    1
}

fn default_total_stages() -> u8 {
    TOTAL_STAGES
}

impl Project {
    /// Create a new project in the `uploading` state.
    pub fn new(name: impl Into<String>, category: VideoCategory, workdir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            category,
            status: ProjectStatus::Uploading,
            current_stage: 1,
            total_stages: TOTAL_STAGES,
            error_message: None,
            workdir,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition into processing at the given stage.
    pub fn start_processing(&mut self, from_stage: u8) {
        self.status = ProjectStatus::Processing;
        self.current_stage = from_stage.clamp(1, TOTAL_STAGES);
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    /// Record a successful run.
    pub fn complete(&mut self) {
        self.status = ProjectStatus::Completed;
        self.current_stage = TOTAL_STAGES;
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    /// Record a failure at a stage, preserving the cause.
    pub fn fail(&mut self, stage: u8, message: impl Into<String>) {
        self.status = ProjectStatus::Error;
        self.current_stage = stage.clamp(1, TOTAL_STAGES);
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// Record a user cancellation.
    pub fn cancel(&mut self, stage: u8) {
        self.status = ProjectStatus::Cancelled;
        self.current_stage = stage.clamp(1, TOTAL_STAGES);
        self.updated_at = Utc::now();
    }

    /// Summary view for the global index.
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            status: self.status,
            current_stage: self.current_stage,
            total_stages: self.total_stages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Compact project record kept in the global `projects.json` index.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub category: VideoCategory,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default = "default_stage")]
    pub current_stage: u8,
    #[serde(default = "default_total_stages")]
    pub total_stages: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
