//! Stage 3: multi-dimensional scoring.

use std::collections::HashMap;

use aclip_models::{
    ScoredClip, Stage2Result, Stage3Result, StageId, SubScores, SubtitleChunk, TimelineItem,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::StageContext;
use crate::error::StageError;
use crate::stages::{parse_entry, response_array, Stage};

/// Raw scoring entry as the LLM returns it.
#[derive(Debug, Deserialize)]
struct RawScore {
    id: String,
    scores: RawSubScores,
    recommend_reason: String,
    #[serde(default)]
    content: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubScores {
    #[serde(default)]
    hook: f64,
    #[serde(default)]
    info: f64,
    #[serde(default)]
    emotion: f64,
    #[serde(default)]
    share: f64,
    #[serde(default)]
    completeness: f64,
}

/// Scores candidate clips and drops those below the threshold.
///
/// The weighted `final_score` is computed here from configuration, never
/// taken from the model. Retained clips are non-overlapping within a chunk;
/// overlaps across chunks are preserved and flagged.
pub struct ScoringStage;

#[async_trait]
impl Stage for ScoringStage {
    fn id(&self) -> StageId {
        StageId::Scoring
    }

    async fn run(&self, ctx: &StageContext) -> Result<(), StageError> {
        let timeline: Stage2Result = ctx.store.read_stage_result(&ctx.project.id).await?;
        let chunks = ctx.load_chunks().await?;

        let mut by_chunk: HashMap<usize, Vec<TimelineItem>> = HashMap::new();
        for item in timeline.items {
            by_chunk.entry(item.chunk_index).or_default().push(item);
        }

        let work: Vec<(SubtitleChunk, Vec<TimelineItem>)> = chunks
            .into_iter()
            .filter_map(|chunk| by_chunk.remove(&chunk.index).map(|items| (chunk, items)))
            .collect();

        info!(project_id = %ctx.project.id, chunks = work.len(), "scoring candidate clips");

        let per_chunk = ctx
            .map_bounded(work, ctx.config.llm_parallelism, |(chunk, items)| {
                score_chunk(ctx, chunk, items)
            })
            .await?;

        let mut clips: Vec<ScoredClip> = per_chunk.into_iter().flatten().collect();
        if clips.is_empty() {
            return Err(StageError::Empty);
        }

        flag_cross_chunk_overlaps(&mut clips);

        ctx.log.append(format!(
            "stage 3: {} clips at or above threshold {}",
            clips.len(),
            ctx.config.min_score_threshold
        ));
        ctx.store
            .write_stage_result(&ctx.project.id, &Stage3Result { clips })
            .await?;
        Ok(())
    }
}

/// One chunk's LLM call plus local post-processing: threshold, then
/// within-chunk overlap resolution in favor of the higher score.
async fn score_chunk(
    ctx: &StageContext,
    chunk: SubtitleChunk,
    items: Vec<TimelineItem>,
) -> Result<Vec<ScoredClip>, StageError> {
    ctx.check_cancelled()?;

    let clips_json = serde_json::to_string_pretty(
        &items
            .iter()
            .map(|i| {
                serde_json::json!({
                    "id": i.id,
                    "topic": i.topic,
                    "start_time": i.start_time,
                    "end_time": i.end_time,
                })
            })
            .collect::<Vec<_>>(),
    )
    .expect("timeline items serialize");

    let prompt = ctx.prompts.render(
        StageId::Scoring,
        ctx.project.category,
        &[("chunk", &chunk.text), ("clips", &clips_json)],
    )?;

    let response = ctx.complete_json(&prompt).await?;
    let entries = response_array(response, StageId::Scoring)?;

    let by_id: HashMap<&str, &TimelineItem> =
        items.iter().map(|i| (i.id.as_str(), i)).collect();

    let mut scored = Vec::new();
    for entry in entries {
        let Some(raw) = parse_entry::<RawScore>(entry, StageId::Scoring) else {
            continue;
        };
        let Some(timeline) = by_id.get(raw.id.as_str()) else {
            warn!(id = %raw.id, "dropping score entry for unknown clip id");
            continue;
        };

        let sub_scores = SubScores {
            hook: raw.scores.hook,
            info: raw.scores.info,
            emotion: raw.scores.emotion,
            share: raw.scores.share,
            completeness: raw.scores.completeness,
        }
        .clamped();
        let final_score = ctx.config.score_weights.combine(&sub_scores);

        // Strict >= keeps a clip sitting exactly on the threshold.
        if final_score < ctx.config.min_score_threshold {
            info!(
                id = %raw.id,
                final_score,
                threshold = ctx.config.min_score_threshold,
                "dropping clip below score threshold"
            );
            continue;
        }

        scored.push(ScoredClip {
            timeline: (*timeline).clone(),
            sub_scores,
            final_score,
            recommend_reason: raw.recommend_reason,
            content: raw.content,
            cross_chunk_overlap: false,
        });
    }

    Ok(resolve_chunk_overlaps(scored))
}

/// Keep the higher-scoring clip of any overlapping pair within a chunk.
fn resolve_chunk_overlaps(mut clips: Vec<ScoredClip>) -> Vec<ScoredClip> {
    clips.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<ScoredClip> = Vec::new();
    for clip in clips {
        if let Some(winner) = kept.iter().find(|k| k.timeline.overlaps(&clip.timeline)) {
            warn!(
                dropped = %clip.timeline.id,
                kept = %winner.timeline.id,
                "dropping clip overlapping a higher-scoring clip in the same chunk"
            );
            continue;
        }
        kept.push(clip);
    }

    // Restore timeline order for stable output files.
    kept.sort_by_key(|c| c.timeline.start_time);
    kept
}

/// Flag, but keep, overlaps between clips from different chunks.
fn flag_cross_chunk_overlaps(clips: &mut [ScoredClip]) {
    for i in 0..clips.len() {
        for j in (i + 1)..clips.len() {
            if clips[i].timeline.chunk_index != clips[j].timeline.chunk_index
                && clips[i].timeline.overlaps(&clips[j].timeline)
            {
                warn!(
                    a = %clips[i].timeline.id,
                    b = %clips[j].timeline.id,
                    "clips from different chunks overlap"
                );
                clips[i].cross_chunk_overlap = true;
                clips[j].cross_chunk_overlap = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclip_models::SrtTime;

    fn clip(id: &str, chunk: usize, start_s: u64, end_s: u64, score: f64) -> ScoredClip {
        ScoredClip {
            timeline: TimelineItem {
                id: id.to_string(),
                topic: "t".to_string(),
                keywords: vec![],
                chunk_index: chunk,
                start_time: SrtTime::from_secs(start_s),
                end_time: SrtTime::from_secs(end_s),
            },
            sub_scores: SubScores::default(),
            final_score: score,
            recommend_reason: String::new(),
            content: vec![],
            cross_chunk_overlap: false,
        }
    }

    #[test]
    fn test_overlap_resolution_keeps_higher_score() {
        let kept = resolve_chunk_overlaps(vec![
            clip("low", 0, 0, 10, 0.72),
            clip("high", 0, 5, 15, 0.9),
            clip("separate", 0, 20, 30, 0.8),
        ]);
        let ids: Vec<&str> = kept.iter().map(|c| c.timeline.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "separate"]);
    }

    #[test]
    fn test_output_sorted_by_start_time() {
        let kept = resolve_chunk_overlaps(vec![
            clip("later", 0, 20, 30, 0.95),
            clip("earlier", 0, 0, 10, 0.75),
        ]);
        assert_eq!(kept[0].timeline.id, "earlier");
        assert_eq!(kept[1].timeline.id, "later");
    }

    #[test]
    fn test_cross_chunk_overlaps_flagged_not_dropped() {
        let mut clips = vec![clip("a", 0, 0, 10, 0.8), clip("b", 1, 5, 15, 0.8)];
        flag_cross_chunk_overlaps(&mut clips);
        assert_eq!(clips.len(), 2);
        assert!(clips[0].cross_chunk_overlap);
        assert!(clips[1].cross_chunk_overlap);
    }

    #[test]
    fn test_same_chunk_not_flagged_cross() {
        let mut clips = vec![clip("a", 0, 0, 10, 0.8), clip("b", 0, 20, 25, 0.8)];
        flag_cross_chunk_overlaps(&mut clips);
        assert!(!clips[0].cross_chunk_overlap);
        assert!(!clips[1].cross_chunk_overlap);
    }
}
