//! Shared data models for the AutoClip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Projects and their lifecycle states
//! - Video categories (prompt variant selection)
//! - Subtitle cues and chunks
//! - Pipeline stage outputs (outline, timeline, scored/titled clips)
//! - Collections and produced media artifacts
//! - SRT timestamp parsing and formatting

pub mod artifact;
pub mod category;
pub mod clip;
pub mod collection;
pub mod outline;
pub mod project;
pub mod stage;
pub mod subtitle;
pub mod timestamp;

// Re-export common types
pub use artifact::{ClipArtifact, CollectionArtifact};
pub use category::VideoCategory;
pub use clip::{ClipRecord, ClipsMetadata, ScoredClip, SubScores, TitledClip};
pub use collection::{
    Collection, CollectionId, CollectionKind, CollectionRecord, CollectionsMetadata,
};
pub use outline::{OutlineItem, TimelineItem};
pub use project::{Project, ProjectId, ProjectStatus, ProjectSummary, TOTAL_STAGES};
pub use stage::{
    Stage1Result, Stage2Result, Stage3Result, Stage4Result, Stage5Result, StageId, StageResult,
};
pub use subtitle::{SrtCue, SubtitleChunk};
pub use timestamp::{SrtTime, TimestampError};
