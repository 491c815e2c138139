//! Stage 1: outline extraction.

use aclip_models::{OutlineItem, Stage1Result, StageId, SubtitleChunk};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::StageError;
use crate::stages::{parse_entry, response_array, Stage};

/// Raw outline entry as the LLM returns it.
#[derive(Debug, Deserialize)]
struct RawOutline {
    topic: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Extracts per-chunk topic outlines from the subtitles.
pub struct OutlineStage;

#[async_trait]
impl Stage for OutlineStage {
    fn id(&self) -> StageId {
        StageId::Outline
    }

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError> {
        let chunks = ctx.load_chunks().await?;
        info!(project_id = %ctx.project.id, chunks = chunks.len(), "extracting outline");
        ctx.log.append(format!("stage 1: {} subtitle chunks", chunks.len()));

        let per_chunk = ctx
            .map_bounded(chunks, ctx.config.llm_parallelism, |chunk| {
                outline_chunk(ctx, chunk)
            })
            .await?;

        let items: Vec<OutlineItem> = per_chunk.into_iter().flatten().collect();
        if items.is_empty() {
            return Err(StageError::Empty);
        }

        ctx.log.append(format!("stage 1: {} outline items", items.len()));
        ctx.store
            .write_stage_result(&ctx.project.id, &Stage1Result { items })
            .await?;
        Ok(())
    }
}

/// One chunk's LLM call: chunk text in, outline items out. Ids are assigned
/// here (`chunk{i}_o{j}`), unique across the project by construction.
async fn outline_chunk(
    ctx: &StageContext,
    chunk: SubtitleChunk,
) -> Result<Vec<OutlineItem>, StageError> {
    ctx.check_cancelled()?;

    let prompt = ctx.prompts.render(
        StageId::Outline,
        ctx.project.category,
        &[("chunk", &chunk.text)],
    )?;

    let response = ctx.complete_json(&prompt).await?;
    let entries = response_array(response, StageId::Outline)?;

    let mut items = Vec::new();
    for entry in entries {
        let Some(raw) = parse_entry::<RawOutline>(entry, StageId::Outline) else {
            continue;
        };
        if raw.topic.trim().is_empty() {
            warn!(chunk = chunk.index, "dropping outline item with empty topic");
            continue;
        }
        items.push(OutlineItem {
            id: format!("chunk{}_o{}", chunk.index, items.len() + 1),
            topic: raw.topic.trim().to_string(),
            keywords: raw.keywords,
            chunk_index: chunk.index,
        });
    }

    Ok(items)
}
