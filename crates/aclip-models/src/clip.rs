//! Scored and titled clip models (stage 3 and 4 outputs).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::artifact::ClipArtifact;
use crate::outline::TimelineItem;

/// The five scoring dimensions returned by the stage-3 LLM call, each in
/// [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SubScores {
    /// Opening hook strength
    pub hook: f64,
    /// Informational value
    pub info: f64,
    /// Emotional impact
    pub emotion: f64,
    /// Shareability
    pub share: f64,
    /// Narrative completeness
    pub completeness: f64,
}

impl SubScores {
    /// Clamp every dimension into [0, 1].
    pub fn clamped(self) -> Self {
        Self {
            hook: self.hook.clamp(0.0, 1.0),
            info: self.info.clamp(0.0, 1.0),
            emotion: self.emotion.clamp(0.0, 1.0),
            share: self.share.clamp(0.0, 1.0),
            completeness: self.completeness.clamp(0.0, 1.0),
        }
    }
}

/// A timeline item that passed stage-3 scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredClip {
    /// The localized topic this clip covers
    #[serde(flatten)]
    pub timeline: TimelineItem,

    /// Raw per-dimension scores from the LLM
    pub sub_scores: SubScores,

    /// Weighted combination of sub-scores, in [0, 1]
    pub final_score: f64,

    /// Why this clip is worth publishing
    pub recommend_reason: String,

    /// Bullet-point content summary
    #[serde(default)]
    pub content: Vec<String>,

    /// Set when the clip's span overlaps a clip from another chunk
    #[serde(default)]
    pub cross_chunk_overlap: bool,
}

impl ScoredClip {
    /// Identifier inherited from the outline item.
    pub fn id(&self) -> &str {
        &self.timeline.id
    }
}

/// A scored clip with its stage-4 generated title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitledClip {
    #[serde(flatten)]
    pub clip: ScoredClip,

    /// Publish-ready title
    pub generated_title: String,
}

impl TitledClip {
    pub fn id(&self) -> &str {
        self.clip.id()
    }
}

/// One entry of the authoritative `clips_metadata.json`, written by stage 6.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipRecord {
    #[serde(flatten)]
    pub clip: TitledClip,

    /// Produced media file
    pub artifact: ClipArtifact,
}

impl ClipRecord {
    pub fn id(&self) -> &str {
        self.clip.id()
    }
}

/// The authoritative clip metadata file (stage 6 output).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClipsMetadata {
    pub clips: Vec<ClipRecord>,
}

impl ClipsMetadata {
    /// Look up a clip by identifier.
    pub fn get(&self, id: &str) -> Option<&ClipRecord> {
        self.clips.iter().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ClipRecord> {
        self.clips.iter_mut().find(|c| c.id() == id)
    }

    /// Remove a clip by identifier, returning whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.clips.len();
        self.clips.retain(|c| c.id() != id);
        self.clips.len() != before
    }
}
