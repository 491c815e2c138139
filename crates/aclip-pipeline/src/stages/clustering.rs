//! Stage 5: thematic clustering into collections.

use std::collections::HashSet;

use aclip_models::{Collection, CollectionKind, Stage4Result, Stage5Result, StageId};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::StageError;
use crate::stages::{parse_entry, response_array, Stage};

#[derive(Debug, Deserialize)]
struct RawCollection {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    clip_ids: Vec<String>,
}

/// Groups titled clips into AI-recommended collections with a single
/// whole-project call. Zero collections is a valid outcome.
pub struct ClusteringStage;

#[async_trait]
impl Stage for ClusteringStage {
    fn id(&self) -> StageId {
        StageId::Clustering
    }

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError> {
        let titled: Stage4Result = ctx.store.read_stage_result(&ctx.project.id).await?;
        if titled.clips.is_empty() {
            return Err(StageError::Empty);
        }

        info!(project_id = %ctx.project.id, clips = titled.clips.len(), "clustering clips");
        ctx.check_cancelled()?;

        let clips_json = serde_json::to_string_pretty(
            &titled
                .clips
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id(),
                        "title": c.generated_title,
                        "topic": c.clip.timeline.topic,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .expect("clip summaries serialize");

        let prompt = ctx.prompts.render(
            StageId::Clustering,
            ctx.project.category,
            &[
                ("clips", &clips_json),
                ("max_clips", &ctx.config.max_clips_per_collection.to_string()),
            ],
        )?;

        let response = ctx.complete_json(&prompt).await?;
        let entries = response_array(response, StageId::Clustering)?;

        let known_ids: HashSet<&str> = titled.clips.iter().map(|c| c.id()).collect();
        let mut collections = Vec::new();

        for entry in entries {
            let Some(raw) = parse_entry::<RawCollection>(entry, StageId::Clustering) else {
                continue;
            };
            if let Some(collection) =
                validate_collection(raw, &known_ids, ctx.config.max_clips_per_collection)
            {
                collections.push(collection);
            }
        }

        ctx.log.append(format!(
            "stage 5: {} collections recommended",
            collections.len()
        ));
        ctx.store
            .write_stage_result(&ctx.project.id, &Stage5Result { collections })
            .await?;
        Ok(())
    }
}

/// Enforce the collection invariants: known clip ids only, no duplicates,
/// size within the cap, at least two members.
fn validate_collection(
    raw: RawCollection,
    known_ids: &HashSet<&str>,
    max_clips: usize,
) -> Option<Collection> {
    if raw.title.trim().is_empty() {
        warn!("dropping collection with empty title");
        return None;
    }

    let mut seen = HashSet::new();
    let mut clip_ids = Vec::new();
    for id in raw.clip_ids {
        if !known_ids.contains(id.as_str()) {
            warn!(clip_id = %id, "dropping unknown clip id from collection");
            continue;
        }
        if !seen.insert(id.clone()) {
            warn!(clip_id = %id, "dropping duplicate clip id from collection");
            continue;
        }
        clip_ids.push(id);
    }

    if clip_ids.len() > max_clips {
        warn!(
            title = %raw.title,
            len = clip_ids.len(),
            max_clips,
            "truncating oversized collection"
        );
        clip_ids.truncate(max_clips);
    }

    if clip_ids.len() < 2 {
        warn!(title = %raw.title, "dropping collection with fewer than two clips");
        return None;
    }

    Some(Collection::new(
        raw.title.trim().to_string(),
        raw.summary.trim().to_string(),
        clip_ids,
        CollectionKind::AiRecommended,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known<'a>() -> HashSet<&'a str> {
        ["c1", "c2", "c3", "c4", "c5", "c6"].into_iter().collect()
    }

    fn raw(ids: &[&str]) -> RawCollection {
        RawCollection {
            title: "Theme".to_string(),
            summary: "s".to_string(),
            clip_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_unknown_and_duplicate_ids_dropped() {
        let c = validate_collection(raw(&["c1", "ghost", "c2", "c1"]), &known(), 5).unwrap();
        assert_eq!(c.clip_ids, vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(c.kind, CollectionKind::AiRecommended);
    }

    #[test]
    fn test_oversized_collection_truncated() {
        let c = validate_collection(raw(&["c1", "c2", "c3", "c4", "c5", "c6"]), &known(), 5)
            .unwrap();
        assert_eq!(c.clip_ids.len(), 5);
    }

    #[test]
    fn test_single_clip_collection_dropped() {
        assert!(validate_collection(raw(&["c1"]), &known(), 5).is_none());
        assert!(validate_collection(raw(&["c1", "ghost"]), &known(), 5).is_none());
    }

    #[test]
    fn test_empty_title_dropped() {
        let mut r = raw(&["c1", "c2"]);
        r.title = "  ".to_string();
        assert!(validate_collection(r, &known(), 5).is_none());
    }
}
