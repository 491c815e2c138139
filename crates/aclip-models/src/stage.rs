//! Pipeline stage identifiers and persisted stage outputs.
//!
//! Stages 1-5 each persist one JSON file under the project's metadata
//! directory. Stage 6 writes the authoritative `clips_metadata.json` and
//! `collections_metadata.json` instead.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clip::{ScoredClip, TitledClip};
use crate::collection::Collection;
use crate::outline::{OutlineItem, TimelineItem};

/// The six pipeline stages, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Outline extraction from subtitle chunks
    Outline,
    /// Timeline localization onto subtitle timestamps
    Timeline,
    /// Multi-dimensional clip scoring
    Scoring,
    /// Title generation
    Title,
    /// Thematic clustering into collections
    Clustering,
    /// Physical clip and collection production
    Video,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [StageId; 6] = [
        StageId::Outline,
        StageId::Timeline,
        StageId::Scoring,
        StageId::Title,
        StageId::Clustering,
        StageId::Video,
    ];

    /// 1-based stage index.
    pub fn index(&self) -> u8 {
        match self {
            StageId::Outline => 1,
            StageId::Timeline => 2,
            StageId::Scoring => 3,
            StageId::Title => 4,
            StageId::Clustering => 5,
            StageId::Video => 6,
        }
    }

    /// Resolve a 1-based index.
    pub fn from_index(index: u8) -> Option<StageId> {
        StageId::ALL.get(index.checked_sub(1)? as usize).copied()
    }

    /// Short machine name, used in prompt paths and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Outline => "outline",
            StageId::Timeline => "timeline",
            StageId::Scoring => "scoring",
            StageId::Title => "title",
            StageId::Clustering => "clustering",
            StageId::Video => "video",
        }
    }

    /// Human-readable step name surfaced in progress reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            StageId::Outline => "Extracting outline",
            StageId::Timeline => "Locating timestamps",
            StageId::Scoring => "Scoring clips",
            StageId::Title => "Generating titles",
            StageId::Clustering => "Clustering collections",
            StageId::Video => "Producing videos",
        }
    }

    /// Stage result filename for stages 1-5; stage 6 has none (it writes the
    /// clips/collections metadata files).
    pub fn result_filename(&self) -> Option<&'static str> {
        match self {
            StageId::Outline => Some("stage1_result.json"),
            StageId::Timeline => Some("stage2_result.json"),
            StageId::Scoring => Some("stage3_result.json"),
            StageId::Title => Some("stage4_result.json"),
            StageId::Clustering => Some("stage5_result.json"),
            StageId::Video => None,
        }
    }

    /// Whether this stage issues LLM calls.
    pub fn uses_llm(&self) -> bool {
        !matches!(self, StageId::Video)
    }

    /// The stage after this one, if any.
    pub fn next(&self) -> Option<StageId> {
        StageId::from_index(self.index() + 1)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} ({})", self.index(), self.name())
    }
}

/// A persisted stage output file.
pub trait StageResult: Serialize + DeserializeOwned {
    /// The stage that owns this file.
    const STAGE: StageId;

    /// An empty output is a hard pipeline error.
    fn is_empty(&self) -> bool;
}

/// Stage 1 output: flat outline across all chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Stage1Result {
    pub items: Vec<OutlineItem>,
}

impl StageResult for Stage1Result {
    const STAGE: StageId = StageId::Outline;

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Stage 2 output: outline items with cue-aligned spans.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Stage2Result {
    pub items: Vec<TimelineItem>,
}

impl StageResult for Stage2Result {
    const STAGE: StageId = StageId::Timeline;

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Stage 3 output: clips that passed the score threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Stage3Result {
    pub clips: Vec<ScoredClip>,
}

impl StageResult for Stage3Result {
    const STAGE: StageId = StageId::Scoring;

    fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Stage 4 output: titled clips. This file never doubles as the clip
/// metadata index; that is written by stage 6 alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Stage4Result {
    pub clips: Vec<TitledClip>,
}

impl StageResult for Stage4Result {
    const STAGE: StageId = StageId::Title;

    fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Stage 5 output: AI-recommended collections. An empty list is a valid
/// output (a project with one clip clusters into nothing).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Stage5Result {
    pub collections: Vec<Collection>,
}

impl StageResult for Stage5Result {
    const STAGE: StageId = StageId::Clustering;

    fn is_empty(&self) -> bool {
        // Zero collections is legitimate; emptiness never fails stage 5.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for stage in StageId::ALL {
            assert_eq!(StageId::from_index(stage.index()), Some(stage));
        }
        assert_eq!(StageId::from_index(0), None);
        assert_eq!(StageId::from_index(7), None);
    }

    #[test]
    fn test_result_filenames() {
        assert_eq!(StageId::Outline.result_filename(), Some("stage1_result.json"));
        assert_eq!(StageId::Clustering.result_filename(), Some("stage5_result.json"));
        assert_eq!(StageId::Video.result_filename(), None);
    }

    #[test]
    fn test_next() {
        assert_eq!(StageId::Outline.next(), Some(StageId::Timeline));
        assert_eq!(StageId::Video.next(), None);
    }

    #[test]
    fn test_stage5_empty_is_valid() {
        assert!(!Stage5Result::default().is_empty());
        assert!(Stage1Result::default().is_empty());
    }
}
