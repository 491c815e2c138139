//! Video category tags.
//!
//! A project carries one category from a closed set; it selects the prompt
//! variant used at every LLM stage. Unknown categories are rejected at
//! project creation, a missing one falls back to [`VideoCategory::Default`].

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Content category of a source video.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum VideoCategory {
    /// General-purpose prompts
    #[default]
    Default,
    /// Lectures, tutorials, explainers
    Knowledge,
    /// Business and finance talk
    Business,
    /// Commentary and opinion pieces
    Opinion,
    /// Personal experience sharing
    Experience,
    /// Speeches and presentations
    Speech,
    /// Reviews of other content
    ContentReview,
    /// Entertainment and variety
    Entertainment,
}

impl VideoCategory {
    /// All recognized categories, in presentation order.
    pub const ALL: [VideoCategory; 8] = [
        VideoCategory::Default,
        VideoCategory::Knowledge,
        VideoCategory::Business,
        VideoCategory::Opinion,
        VideoCategory::Experience,
        VideoCategory::Speech,
        VideoCategory::ContentReview,
        VideoCategory::Entertainment,
    ];

    /// The snake_case identifier used on the wire and in prompt file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCategory::Default => "default",
            VideoCategory::Knowledge => "knowledge",
            VideoCategory::Business => "business",
            VideoCategory::Opinion => "opinion",
            VideoCategory::Experience => "experience",
            VideoCategory::Speech => "speech",
            VideoCategory::ContentReview => "content_review",
            VideoCategory::Entertainment => "entertainment",
        }
    }

    /// Human-readable label for UI listings.
    pub fn label(&self) -> &'static str {
        match self {
            VideoCategory::Default => "General",
            VideoCategory::Knowledge => "Knowledge",
            VideoCategory::Business => "Business",
            VideoCategory::Opinion => "Opinion",
            VideoCategory::Experience => "Experience",
            VideoCategory::Speech => "Speech",
            VideoCategory::ContentReview => "Content Review",
            VideoCategory::Entertainment => "Entertainment",
        }
    }
}

impl fmt::Display for VideoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown category strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown video category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for VideoCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
