//! Stage 2: timeline localization.

use std::collections::HashMap;

use aclip_models::{
    OutlineItem, SrtTime, Stage1Result, Stage2Result, StageId, SubtitleChunk, TimelineItem,
};
use aclip_subtitle::SubtitleStore;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::StageError;
use crate::stages::{parse_entry, response_array, Stage};

/// Raw timeline entry as the LLM returns it.
#[derive(Debug, Deserialize)]
struct RawTimeline {
    id: String,
    start_time: String,
    end_time: String,
}

/// Localizes outline topics onto cue-aligned timestamps.
pub struct TimelineStage;

#[async_trait]
impl Stage for TimelineStage {
    fn id(&self) -> StageId {
        StageId::Timeline
    }

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError> {
        let outline: Stage1Result = ctx.store.read_stage_result(&ctx.project.id).await?;
        let chunks = ctx.load_chunks().await?;

        // Group outline items by their originating chunk.
        let mut by_chunk: HashMap<usize, Vec<OutlineItem>> = HashMap::new();
        for item in outline.items {
            by_chunk.entry(item.chunk_index).or_default().push(item);
        }

        info!(
            project_id = %ctx.project.id,
            chunks = by_chunk.len(),
            "localizing outline onto timestamps"
        );

        let work: Vec<(SubtitleChunk, Vec<OutlineItem>)> = chunks
            .into_iter()
            .filter_map(|chunk| {
                by_chunk
                    .remove(&chunk.index)
                    .map(|items| (chunk, items))
            })
            .collect();

        let per_chunk = ctx
            .map_bounded(work, ctx.config.llm_parallelism, |(chunk, items)| {
                localize_chunk(ctx, chunk, items)
            })
            .await?;

        let items: Vec<TimelineItem> = per_chunk.into_iter().flatten().collect();
        if items.is_empty() {
            return Err(StageError::Empty);
        }

        ctx.log.append(format!("stage 2: {} timeline items", items.len()));
        ctx.store
            .write_stage_result(&ctx.project.id, &Stage2Result { items })
            .await?;
        Ok(())
    }
}

/// One chunk's LLM call: timestamped cues plus outline in, spans out. Spans
/// are snapped to real cue boundaries; items the model could not localize
/// are dropped with a warning.
async fn localize_chunk(
    ctx: &StageContext,
    chunk: SubtitleChunk,
    items: Vec<OutlineItem>,
) -> Result<Vec<TimelineItem>, StageError> {
    ctx.check_cancelled()?;

    let outline_json = serde_json::to_string_pretty(
        &items
            .iter()
            .map(|i| serde_json::json!({"id": i.id, "topic": i.topic}))
            .collect::<Vec<_>>(),
    )
    .expect("outline items serialize");

    let prompt = ctx.prompts.render(
        StageId::Timeline,
        ctx.project.category,
        &[
            ("chunk", &chunk.to_prompt_text()),
            ("outline", &outline_json),
        ],
    )?;

    let response = ctx.complete_json(&prompt).await?;
    let entries = response_array(response, StageId::Timeline)?;

    let by_id: HashMap<&str, &OutlineItem> =
        items.iter().map(|i| (i.id.as_str(), i)).collect();
    let snapper = SubtitleStore::new(chunk.cues.clone());

    let mut localized = Vec::new();
    for entry in entries {
        let Some(raw) = parse_entry::<RawTimeline>(entry, StageId::Timeline) else {
            continue;
        };
        let Some(outline_item) = by_id.get(raw.id.as_str()) else {
            warn!(id = %raw.id, "dropping timeline entry for unknown outline id");
            continue;
        };

        let (Ok(start), Ok(end)) = (
            raw.start_time.parse::<SrtTime>(),
            raw.end_time.parse::<SrtTime>(),
        ) else {
            warn!(id = %raw.id, "dropping timeline entry with unparseable timestamps");
            continue;
        };

        let (start, end) = snapper.snap_span(start, end);
        if start >= end {
            warn!(id = %raw.id, "dropping timeline entry with empty span after snapping");
            continue;
        }

        localized.push(TimelineItem {
            id: outline_item.id.clone(),
            topic: outline_item.topic.clone(),
            keywords: outline_item.keywords.clone(),
            chunk_index: outline_item.chunk_index,
            start_time: start,
            end_time: end,
        });
    }

    Ok(localized)
}
