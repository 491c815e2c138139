//! Collection models (stage 5 output and manual groupings).

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::CollectionArtifact;

/// Unique identifier for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl CollectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a collection came to exist.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Proposed by the stage-5 clustering call
    #[default]
    AiRecommended,
    /// Created or rebuilt by the user
    Manual,
}

/// An ordered, themed grouping of clips. Clips are referenced by identifier;
/// the collection never owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Collection {
    /// Unique collection ID
    pub id: CollectionId,

    /// Collection title
    pub title: String,

    /// One-paragraph theme summary
    #[serde(default)]
    pub summary: String,

    /// Ordered clip identifiers; order is meaningful and preserved
    pub clip_ids: Vec<String>,

    /// Origin of the collection
    #[serde(default, rename = "type")]
    pub kind: CollectionKind,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Create a new collection.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        clip_ids: Vec<String>,
        kind: CollectionKind,
    ) -> Self {
        Self {
            id: CollectionId::new(),
            title: title.into(),
            summary: summary.into(),
            clip_ids,
            kind,
            created_at: Utc::now(),
        }
    }

    /// True when `clip_ids` holds no duplicates.
    pub fn has_unique_clips(&self) -> bool {
        let mut seen = HashSet::new();
        self.clip_ids.iter().all(|id| seen.insert(id.as_str()))
    }

    /// Drop a clip reference, preserving the order of the rest. Returns
    /// whether the clip was referenced.
    pub fn remove_clip(&mut self, clip_id: &str) -> bool {
        let before = self.clip_ids.len();
        self.clip_ids.retain(|id| id != clip_id);
        self.clip_ids.len() != before
    }
}

/// One entry of the authoritative `collections_metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CollectionRecord {
    #[serde(flatten)]
    pub collection: Collection,

    /// Produced concatenated media, absent until stage 6 ran for it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<CollectionArtifact>,
}

/// The authoritative collection metadata file (stage 6 output).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CollectionsMetadata {
    pub collections: Vec<CollectionRecord>,
}

impl CollectionsMetadata {
    pub fn get(&self, id: &str) -> Option<&CollectionRecord> {
        self.collections.iter().find(|c| c.collection.id.as_str() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CollectionRecord> {
        self.collections
            .iter_mut()
            .find(|c| c.collection.id.as_str() == id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.collections.len();
        self.collections.retain(|c| c.collection.id.as_str() != id);
        self.collections.len() != before
    }
}
