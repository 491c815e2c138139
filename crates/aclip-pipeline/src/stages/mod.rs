//! Stage implementations.

mod clustering;
mod outline;
mod scoring;
mod timeline;
mod title;
mod video;

use aclip_models::StageId;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::context::StageContext;
use crate::error::StageError;

pub use clustering::ClusteringStage;
pub use outline::OutlineStage;
pub use scoring::ScoringStage;
pub use timeline::TimelineStage;
pub use title::TitleStage;
pub use video::VideoStage;

/// One pipeline stage: load predecessor output, transform, persist.
#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError>;
}

/// The runner for a stage id.
pub fn stage_runner(id: StageId) -> Box<dyn Stage> {
    match id {
        StageId::Outline => Box::new(OutlineStage),
        StageId::Timeline => Box::new(TimelineStage),
        StageId::Scoring => Box::new(ScoringStage),
        StageId::Title => Box::new(TitleStage),
        StageId::Clustering => Box::new(ClusteringStage),
        StageId::Video => Box::new(VideoStage),
    }
}

/// Interpret a stage's LLM response as a list.
///
/// Accepts a bare array or an object wrapping one under `items`; anything
/// else is invalid output for the list-shaped stages.
pub(crate) fn response_array(value: Value, stage: StageId) -> Result<Vec<Value>, StageError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(StageError::invalid(format!(
                "{} response is not a JSON array",
                stage
            ))),
        },
        _ => Err(StageError::invalid(format!(
            "{} response is not a JSON array",
            stage
        ))),
    }
}

/// Deserialize one entry of a stage response, dropping invalid entries with
/// a warning per the stage contract.
pub(crate) fn parse_entry<T: serde::de::DeserializeOwned>(
    value: Value,
    stage: StageId,
) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(%stage, "dropping invalid response entry: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_array_accepts_bare_array() {
        let items = response_array(json!([1, 2]), StageId::Outline).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_response_array_unwraps_items_object() {
        let items = response_array(json!({"items": [1]}), StageId::Outline).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_response_array_rejects_scalar_object() {
        assert!(response_array(json!({"topic": "x"}), StageId::Outline).is_err());
    }
}
