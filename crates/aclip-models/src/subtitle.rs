//! Subtitle cue and chunk models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::SrtTime;

/// A single subtitle cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SrtCue {
    /// 1-based cue index
    pub index: usize,

    /// Display start time
    pub start: SrtTime,

    /// Display end time
    pub end: SrtTime,

    /// Cue text, multi-line cues joined with '\n'
    pub text: String,
}

impl SrtCue {
    /// Whether a timestamp falls inside this cue's display window.
    pub fn contains(&self, t: SrtTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// A contiguous, cue-aligned slice of the subtitle stream sized to the LLM
/// context budget. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleChunk {
    /// 0-based chunk index
    pub index: usize,

    /// Start of the first cue
    pub start: SrtTime,

    /// End of the last cue
    pub end: SrtTime,

    /// Concatenated cue text
    pub text: String,

    /// The cues retained for timestamp snapping
    pub cues: Vec<SrtCue>,
}

impl SubtitleChunk {
    /// Character length of the chunk text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Render the chunk as timestamped lines for prompt embedding:
    /// `[HH:MM:SS,mmm --> HH:MM:SS,mmm] text`.
    pub fn to_prompt_text(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + self.cues.len() * 32);
        for cue in &self.cues {
            out.push('[');
            out.push_str(&cue.start.to_string());
            out.push_str(" --> ");
            out.push_str(&cue.end.to_string());
            out.push_str("] ");
            out.push_str(&cue.text);
            out.push('\n');
        }
        out
    }
}
