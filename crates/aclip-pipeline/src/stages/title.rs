//! Stage 4: title generation.

use aclip_models::{ScoredClip, Stage3Result, Stage4Result, StageId, TitledClip};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::StageError;
use crate::stages::Stage;

#[derive(Debug, Deserialize)]
struct RawTitle {
    title: String,
}

/// Generates a publish-ready title for every surviving clip.
///
/// This stage writes `stage4_result.json` only; the aggregate clip metadata
/// file belongs exclusively to stage 6.
pub struct TitleStage;

#[async_trait]
impl Stage for TitleStage {
    fn id(&self) -> StageId {
        StageId::Title
    }

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError> {
        let scored: Stage3Result = ctx.store.read_stage_result(&ctx.project.id).await?;
        if scored.clips.is_empty() {
            return Err(StageError::Empty);
        }

        info!(project_id = %ctx.project.id, clips = scored.clips.len(), "generating titles");

        let clips = ctx
            .map_bounded(scored.clips, ctx.config.llm_parallelism, |clip| {
                title_clip(ctx, clip)
            })
            .await?;

        ctx.log.append(format!("stage 4: {} clips titled", clips.len()));
        ctx.store
            .write_stage_result(&ctx.project.id, &Stage4Result { clips })
            .await?;
        Ok(())
    }
}

/// One clip's LLM call. Every clip that reached this stage gets a title; an
/// unusable model response falls back to the topic sentence.
async fn title_clip(ctx: &StageContext, clip: ScoredClip) -> Result<TitledClip, StageError> {
    ctx.check_cancelled()?;

    let clip_json = serde_json::to_string_pretty(&serde_json::json!({
        "topic": clip.timeline.topic,
        "recommend_reason": clip.recommend_reason,
        "content": clip.content,
    }))
    .expect("clip summary serializes");

    let prompt = ctx.prompts.render(
        StageId::Title,
        ctx.project.category,
        &[("clip", &clip_json)],
    )?;

    let response = ctx.complete_json(&prompt).await?;
    let generated_title = match serde_json::from_value::<RawTitle>(response) {
        Ok(raw) if !raw.title.trim().is_empty() => raw.title.trim().to_string(),
        _ => {
            warn!(id = %clip.timeline.id, "unusable title response, falling back to topic");
            clip.timeline.topic.clone()
        }
    };

    Ok(TitledClip {
        clip,
        generated_title,
    })
}
