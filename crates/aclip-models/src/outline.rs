//! Outline and timeline models (stage 1 and 2 outputs).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::SrtTime;

/// A topic extracted from one subtitle chunk by stage 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineItem {
    /// Identifier, stable within the project (`chunk{i}_o{j}` form)
    pub id: String,

    /// One-sentence topic statement
    pub topic: String,

    /// Topic keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Index of the originating chunk
    pub chunk_index: usize,
}

/// An outline topic localized back onto subtitle timestamps by stage 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineItem {
    /// Outline identifier this item localizes
    pub id: String,

    /// Topic statement, carried over from the outline
    pub topic: String,

    /// Topic keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Index of the originating chunk
    pub chunk_index: usize,

    /// Cue-aligned start timestamp
    pub start_time: SrtTime,

    /// Cue-aligned end timestamp
    pub end_time: SrtTime,
}

impl TimelineItem {
    /// Span length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_time.saturating_sub(self.start_time).as_secs_f64()
    }

    /// Whether this item's span overlaps another's.
    pub fn overlaps(&self, other: &TimelineItem) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}
