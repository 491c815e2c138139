//! End-to-end pipeline scenarios over a scripted LLM and a fake transcoder.

mod common;

use std::time::Duration;

use aclip_models::{ProjectStatus, SrtTime, Stage4Result, StageId};
use aclip_pipeline::{null_sink, PipelineError, RunOutcome};
use tokio::sync::watch;

use common::*;

fn no_cancel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    // Leak the sender so the channel stays open for the run's duration.
    std::mem::forget(tx);
    rx
}

#[tokio::test]
async fn happy_path_produces_one_clip_and_no_collections() {
    let fx = fixture(happy_path_provider(0.82, 0.65), hook_only_config()).await;

    let outcome = fx
        .pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let project = fx.store.load_project(&fx.project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);

    // Every stage output file exists.
    for stage in StageId::ALL {
        assert!(
            fx.store.stage_result_exists(&fx.project.id, stage).await,
            "missing output of {}",
            stage
        );
    }

    // Exactly one clip: o1 snapped to 0-5s, titled, above threshold.
    let clips = fx.store.read_clips_metadata(&fx.project.id).await.unwrap();
    assert_eq!(clips.clips.len(), 1);
    let record = &clips.clips[0];
    assert_eq!(record.id(), "chunk0_o1");
    assert_eq!(record.clip.generated_title, "AB Highlight");
    assert_eq!(record.clip.clip.timeline.start_time, SrtTime::from_secs(0));
    assert_eq!(record.clip.clip.timeline.end_time, SrtTime::from_secs(5));
    assert!(record.clip.clip.final_score >= 0.7);

    // The produced file exists where the artifact points.
    let paths = fx.store.paths(&fx.project.id);
    assert!(paths.clip_video("chunk0_o1").exists());
    assert!(paths.root().join(&record.artifact.path).exists());

    // Zero collections, as an empty list rather than a missing file.
    let collections = fx
        .store
        .read_collections_metadata(&fx.project.id)
        .await
        .unwrap();
    assert!(collections.collections.is_empty());
    assert!(paths.collections_metadata().exists());
}

#[tokio::test]
async fn threshold_is_inclusive_at_exactly_min_score() {
    // 0.70 stays, 0.6999 goes.
    let fx = fixture(happy_path_provider(0.70, 0.6999), hook_only_config()).await;

    fx.pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap();

    let clips = fx.store.read_clips_metadata(&fx.project.id).await.unwrap();
    assert_eq!(clips.clips.len(), 1);
    assert_eq!(clips.clips[0].id(), "chunk0_o1");
}

#[tokio::test]
async fn all_clips_below_threshold_is_stage_empty() {
    let fx = fixture(happy_path_provider(0.2, 0.3), hook_only_config()).await;

    let err = fx
        .pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::StageEmpty(StageId::Scoring)));

    let project = fx.store.load_project(&fx.project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Error);
    assert_eq!(project.current_stage, 3);
}

#[tokio::test]
async fn stage_failure_then_resume_preserves_earlier_outputs() {
    // Scoring fails with a provider outage.
    let provider = happy_path_provider(0.82, 0.65);
    provider.on(SCORING_MARK, Reply::Fail);
    let fx = fixture(provider.clone(), hook_only_config()).await;

    let err = fx
        .pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::StageFailed {
            stage: StageId::Scoring,
            ..
        }
    ));

    let project = fx.store.load_project(&fx.project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Error);
    assert_eq!(project.current_stage, 3);
    assert!(project.error_message.is_some());

    // Stages 1-2 are on disk, stage 3 is not.
    assert!(fx.store.stage_result_exists(&fx.project.id, StageId::Outline).await);
    assert!(fx.store.stage_result_exists(&fx.project.id, StageId::Timeline).await);
    assert!(!fx.store.stage_result_exists(&fx.project.id, StageId::Scoring).await);

    let paths = fx.store.paths(&fx.project.id);
    let stage1_before = tokio::fs::read(paths.stage_result(StageId::Outline).unwrap())
        .await
        .unwrap();
    let stage2_before = tokio::fs::read(paths.stage_result(StageId::Timeline).unwrap())
        .await
        .unwrap();

    // The provider recovers; resume from the failed stage.
    provider.on(
        SCORING_MARK,
        Reply::Text(format!(
            r#"[{{"id": "chunk0_o1", "scores": {}, "recommend_reason": "strong", "content": []}}]"#,
            scores(0.9)
        )),
    );

    let outcome = fx
        .pipeline
        .resume(&fx.project.id, 3, no_cancel(), null_sink())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let project = fx.store.load_project(&fx.project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);

    // Stage 1-2 files were not rewritten.
    let stage1_after = tokio::fs::read(paths.stage_result(StageId::Outline).unwrap())
        .await
        .unwrap();
    let stage2_after = tokio::fs::read(paths.stage_result(StageId::Timeline).unwrap())
        .await
        .unwrap();
    assert_eq!(stage1_before, stage1_after);
    assert_eq!(stage2_before, stage2_after);
}

#[tokio::test]
async fn retry_restarts_at_recorded_failed_stage() {
    let provider = happy_path_provider(0.82, 0.65);
    provider.on(SCORING_MARK, Reply::Fail);
    let fx = fixture(provider.clone(), hook_only_config()).await;

    let _ = fx
        .pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap_err();

    provider.on(
        SCORING_MARK,
        Reply::Text(format!(
            r#"[{{"id": "chunk0_o1", "scores": {}, "recommend_reason": "ok", "content": []}}]"#,
            scores(0.9)
        )),
    );

    let outcome = fx
        .pipeline
        .retry(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
}

#[tokio::test]
async fn cancel_mid_stage_removes_partial_output() {
    // Stage 2 hangs; cancellation lands while it is in flight.
    let provider = happy_path_provider(0.82, 0.65);
    provider.on(TIMELINE_MARK, Reply::Hang);
    let fx = fixture(provider, hook_only_config()).await;

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let pipeline = fx.pipeline.clone();
    let project_id = fx.project.id.clone();
    let run = tokio::spawn(async move {
        pipeline.start(&project_id, cancel_rx, null_sink()).await
    });

    // Give stage 1 time to finish and stage 2 time to start hanging.
    tokio::time::sleep(Duration::from_millis(400)).await;
    cancel_tx.send(true).unwrap();

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);

    let project = fx.store.load_project(&fx.project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Cancelled);

    // Stage 1 intact, no stage 2 file.
    assert!(fx.store.stage_result_exists(&fx.project.id, StageId::Outline).await);
    assert!(!fx.store.stage_result_exists(&fx.project.id, StageId::Timeline).await);
}

#[tokio::test]
async fn rerunning_a_stage_is_byte_identical() {
    let fx = fixture(happy_path_provider(0.82, 0.65), hook_only_config()).await;

    fx.pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap();

    let paths = fx.store.paths(&fx.project.id);
    let mut before = Vec::new();
    for stage in [StageId::Outline, StageId::Timeline, StageId::Scoring, StageId::Title] {
        before.push(
            tokio::fs::read(paths.stage_result(stage).unwrap())
                .await
                .unwrap(),
        );
    }

    // Re-run everything with the same deterministic responses.
    fx.pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap();

    for (i, stage) in [StageId::Outline, StageId::Timeline, StageId::Scoring, StageId::Title]
        .into_iter()
        .enumerate()
    {
        let after = tokio::fs::read(paths.stage_result(stage).unwrap())
            .await
            .unwrap();
        assert_eq!(before[i], after, "output of {} changed across reruns", stage);
    }
}

#[tokio::test]
async fn resume_requires_predecessor_outputs() {
    let fx = fixture(happy_path_provider(0.82, 0.65), hook_only_config()).await;

    let err = fx
        .pipeline
        .resume(&fx.project.id, 3, no_cancel(), null_sink())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingPrerequisite(StageId::Outline)
    ));

    // The project was never marked processing.
    let project = fx.store.load_project(&fx.project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Uploading);
}

#[tokio::test]
async fn invalid_stage_index_rejected() {
    let fx = fixture(happy_path_provider(0.82, 0.65), hook_only_config()).await;
    let err = fx
        .pipeline
        .resume(&fx.project.id, 9, no_cancel(), null_sink())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidStage(9)));
}

#[tokio::test]
async fn clustered_collection_is_concatenated_in_order() {
    // Three surviving clips and one collection referencing them in a
    // deliberate non-chronological order.
    let provider = ScriptedProvider::new()
        .on(
            OUTLINE_MARK,
            Reply::Text(
                r#"[{"topic": "A"}, {"topic": "B"}, {"topic": "C"}]"#.to_string(),
            ),
        )
        .on(
            TIMELINE_MARK,
            Reply::Text(
                r#"[
                    {"id": "chunk0_o1", "start_time": "00:00:00,000", "end_time": "00:00:05,000"},
                    {"id": "chunk0_o2", "start_time": "00:00:05,000", "end_time": "00:00:10,000"},
                    {"id": "chunk0_o3", "start_time": "00:00:10,000", "end_time": "00:00:15,000"}
                ]"#
                .to_string(),
            ),
        )
        .on(
            SCORING_MARK,
            Reply::Text(format!(
                r#"[
                    {{"id": "chunk0_o1", "scores": {s}, "recommend_reason": "r", "content": []}},
                    {{"id": "chunk0_o2", "scores": {s}, "recommend_reason": "r", "content": []}},
                    {{"id": "chunk0_o3", "scores": {s}, "recommend_reason": "r", "content": []}}
                ]"#,
                s = scores(0.9)
            )),
        )
        .on(TITLE_MARK, Reply::Text(r#"{"title": "T"}"#.to_string()))
        .on(
            CLUSTER_MARK,
            Reply::Text(
                r#"[{"title": "Theme", "summary": "s", "clip_ids": ["chunk0_o2", "chunk0_o1", "chunk0_o3"]}]"#
                    .to_string(),
            ),
        );

    let fx = fixture(provider, hook_only_config()).await;
    fx.pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap();

    let collections = fx
        .store
        .read_collections_metadata(&fx.project.id)
        .await
        .unwrap();
    assert_eq!(collections.collections.len(), 1);
    let record = &collections.collections[0];
    assert_eq!(
        record.collection.clip_ids,
        vec!["chunk0_o2", "chunk0_o1", "chunk0_o3"]
    );
    assert!(record.artifact.is_some());

    // The transcoder saw the inputs in the collection's order.
    let calls = fx.transcoder.concat_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let names: Vec<String> = calls[0]
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["chunk0_o2.mp4", "chunk0_o1.mp4", "chunk0_o3.mp4"]
    );
}

#[tokio::test]
async fn stage_four_does_not_write_clips_metadata() {
    // Run only stages 1-4 by scripting stage 5 to fail, then check the
    // aggregate metadata file is still absent.
    let provider = happy_path_provider(0.82, 0.65);
    provider.on(CLUSTER_MARK, Reply::Fail);
    let fx = fixture(provider, hook_only_config()).await;

    let err = fx
        .pipeline
        .start(&fx.project.id, no_cancel(), null_sink())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::StageFailed {
            stage: StageId::Clustering,
            ..
        }
    ));

    // Stage 4 wrote its own file only.
    let stage4: Stage4Result = fx.store.read_stage_result(&fx.project.id).await.unwrap();
    assert_eq!(stage4.clips.len(), 1);
    assert!(!fx.store.paths(&fx.project.id).clips_metadata().exists());
}
