//! Stage 6: physical clip and collection production.

use std::path::PathBuf;

use aclip_models::{
    ClipRecord, ClipsMetadata, CollectionKind, CollectionRecord, CollectionsMetadata,
    Stage4Result, Stage5Result, StageId, TitledClip,
};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::StageError;
use crate::stages::Stage;

/// Cuts every titled clip, concatenates every collection, and writes the
/// authoritative `clips_metadata.json` and `collections_metadata.json`.
///
/// No LLM calls. Manual collections already present in the metadata file
/// survive a re-run; AI-recommended ones are rebuilt from the stage-5
/// output.
pub struct VideoStage;

#[async_trait]
impl Stage for VideoStage {
    fn id(&self) -> StageId {
        StageId::Video
    }

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError> {
        let titled: Stage4Result = ctx.store.read_stage_result(&ctx.project.id).await?;
        let clustered: Stage5Result = ctx.store.read_stage_result(&ctx.project.id).await?;
        if titled.clips.is_empty() {
            return Err(StageError::Empty);
        }

        let paths = ctx.store.paths(&ctx.project.id);
        let source = paths.input_video();

        info!(
            project_id = %ctx.project.id,
            clips = titled.clips.len(),
            collections = clustered.collections.len(),
            "producing media"
        );

        // Cut clips under the global transcode cap.
        let records = ctx
            .map_bounded(
                titled.clips,
                ctx.config.transcode_parallelism,
                |clip| produce_clip(ctx, source.clone(), clip),
            )
            .await?;

        let clips_meta = ClipsMetadata { clips: records };

        // Concatenate collections sequentially in stage-5 order; each job is
        // itself bounded by the transcode timeout.
        let mut collection_records = Vec::new();
        for collection in clustered.collections {
            ctx.check_cancelled()?;
            let record = produce_collection(ctx, &clips_meta, collection).await?;
            collection_records.push(record);
        }

        // Manual collections are user state, not stage-5 output; keep them.
        let existing = ctx.store.read_collections_metadata(&ctx.project.id).await?;
        for record in existing.collections {
            if record.collection.kind == CollectionKind::Manual {
                collection_records.push(record);
            }
        }

        ctx.log.append(format!(
            "stage 6: {} clips, {} collections produced",
            clips_meta.clips.len(),
            collection_records.len()
        ));

        ctx.store
            .write_clips_metadata(&ctx.project.id, &clips_meta)
            .await?;
        ctx.store
            .write_collections_metadata(
                &ctx.project.id,
                &CollectionsMetadata {
                    collections: collection_records,
                },
            )
            .await?;
        Ok(())
    }
}

/// Cut one clip and render its thumbnail. A failed cut retries once before
/// escalating; a failed thumbnail only warns.
async fn produce_clip(
    ctx: &StageContext,
    source: PathBuf,
    clip: TitledClip,
) -> Result<ClipRecord, StageError> {
    ctx.check_cancelled()?;

    let paths = ctx.store.paths(&ctx.project.id);
    let output = paths.clip_video(clip.id());
    let start = clip.clip.timeline.start_time;
    let end = clip.clip.timeline.end_time;

    let mut artifact = ctx
        .transcoder
        .cut(
            &source,
            &output,
            start,
            end,
            ctx.config.transcode_timeout,
            Some(ctx.cancel_rx.clone()),
        )
        .await;

    if let Err(e) = &artifact {
        if !matches!(e, aclip_media::MediaError::Cancelled) {
            warn!(clip_id = %clip.id(), "clip cut failed, retrying once: {}", e);
            ctx.check_cancelled()?;
            artifact = ctx
                .transcoder
                .cut(
                    &source,
                    &output,
                    start,
                    end,
                    ctx.config.transcode_timeout,
                    Some(ctx.cancel_rx.clone()),
                )
                .await;
        }
    }
    let mut artifact = artifact?;

    if let Err(e) = ctx
        .transcoder
        .thumbnail(&output, &paths.clip_thumbnail(clip.id()))
        .await
    {
        warn!(clip_id = %clip.id(), "thumbnail generation failed: {}", e);
    }

    // Record the path relative to the working directory.
    artifact.path = PathBuf::from("output/clips").join(format!("{}.mp4", clip.id()));
    Ok(ClipRecord {
        clip,
        artifact,
    })
}

/// Concatenate one collection's clips in their stored order.
async fn produce_collection(
    ctx: &StageContext,
    clips: &ClipsMetadata,
    collection: aclip_models::Collection,
) -> Result<CollectionRecord, StageError> {
    let paths = ctx.store.paths(&ctx.project.id);

    let inputs: Vec<PathBuf> = collection
        .clip_ids
        .iter()
        .filter_map(|id| {
            if clips.get(id).is_none() {
                warn!(clip_id = %id, "collection references clip without artifact");
                return None;
            }
            Some(paths.clip_video(id))
        })
        .collect();

    if inputs.len() < 2 {
        return Err(StageError::invalid(format!(
            "collection '{}' has fewer than two producible clips",
            collection.title
        )));
    }

    let output = paths.collection_video(collection.id.as_str());
    let mut artifact = ctx
        .transcoder
        .concat(
            &inputs,
            &output,
            &paths.temp_dir(),
            ctx.config.transcode_timeout,
            Some(ctx.cancel_rx.clone()),
        )
        .await;

    if let Err(e) = &artifact {
        if !matches!(e, aclip_media::MediaError::Cancelled) {
            warn!(collection_id = %collection.id, "concat failed, retrying once: {}", e);
            ctx.check_cancelled()?;
            artifact = ctx
                .transcoder
                .concat(
                    &inputs,
                    &output,
                    &paths.temp_dir(),
                    ctx.config.transcode_timeout,
                    Some(ctx.cancel_rx.clone()),
                )
                .await;
        }
    }
    let mut artifact = artifact?;

    artifact.path =
        PathBuf::from("output/collections").join(format!("{}.mp4", collection.id));
    Ok(CollectionRecord {
        collection,
        artifact: Some(artifact),
    })
}
