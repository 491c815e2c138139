//! Fixtures for API-level tests: scripted provider, fake transcoder,
//! assembled application state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aclip_api::{ApiConfig, AppState};
use aclip_llm::{ChatProvider, ChatResponse, LlmConfig, LlmError, LlmGateway, LlmResult, TokenUsage};
use aclip_media::{MediaError, MediaResult};
use aclip_models::{
    ClipArtifact, ClipRecord, ClipsMetadata, Collection, CollectionArtifact, CollectionKind,
    CollectionRecord, CollectionsMetadata, ProjectId, ScoredClip, SrtTime, SubScores,
    TimelineItem, TitledClip,
};
use aclip_pipeline::{PipelineConfig, PromptLibrary, Transcoder};
use aclip_scheduler::SchedulerConfig;
use aclip_store::ProjectStore;
use async_trait::async_trait;
use tokio::sync::watch;

pub const THREE_CUE_SRT: &str = "1\n00:00:00,000 --> 00:00:05,000\nA\n\n2\n00:00:05,000 --> 00:00:10,000\nB\n\n3\n00:00:10,000 --> 00:00:15,000\nC\n";

/// Provider whose every call hangs; used to hold a scheduler slot open.
pub struct HangingProvider;

#[async_trait]
impl ChatProvider for HangingProvider {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn chat(&self, _prompt: &str, _timeout: Duration) -> LlmResult<ChatResponse> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(LlmError::Timeout(60))
    }
}

/// Provider answering every prompt with the same text.
pub struct ConstProvider(pub String);

#[async_trait]
impl ChatProvider for ConstProvider {
    fn name(&self) -> &'static str {
        "const"
    }

    async fn chat(&self, _prompt: &str, _timeout: Duration) -> LlmResult<ChatResponse> {
        Ok(ChatResponse {
            text: self.0.clone(),
            usage: TokenUsage::new(1, 1),
        })
    }
}

/// Transcoder that concatenates file bytes and records concat input order.
#[derive(Default)]
pub struct RecordingTranscoder {
    pub concat_calls: Mutex<Vec<Vec<PathBuf>>>,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn cut(
        &self,
        _source: &Path,
        output: &Path,
        start: SrtTime,
        end: SrtTime,
        _timeout: Duration,
        _cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<ClipArtifact> {
        let body = format!("clip {} {}", start, end);
        tokio::fs::write(output, &body).await?;
        Ok(ClipArtifact::new(
            output,
            end.saturating_sub(start).as_secs_f64(),
            body.len() as u64,
        ))
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        _work_dir: &Path,
        _timeout: Duration,
        _cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<CollectionArtifact> {
        self.concat_calls.lock().unwrap().push(inputs.to_vec());
        let mut body = Vec::new();
        for input in inputs {
            if !tokio::fs::try_exists(input).await.unwrap_or(false) {
                return Err(MediaError::FileNotFound(input.clone()));
            }
            body.extend(tokio::fs::read(input).await?);
        }
        tokio::fs::write(output, &body).await?;
        Ok(CollectionArtifact::new(
            output,
            inputs.len() as f64,
            body.len() as u64,
        ))
    }

    async fn thumbnail(&self, _video: &Path, output: &Path) -> MediaResult<()> {
        tokio::fs::write(output, b"jpeg").await?;
        Ok(())
    }
}

pub struct ApiFixture {
    pub state: AppState,
    pub transcoder: Arc<RecordingTranscoder>,
    _tmp: tempfile::TempDir,
}

/// Assemble application state over a temp store, the given provider and a
/// recording transcoder.
pub async fn api_fixture(provider: Arc<dyn ChatProvider>, capacity: usize) -> ApiFixture {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(ProjectStore::open(tmp.path()).await.unwrap());
    let gateway = Arc::new(LlmGateway::with_provider(
        provider,
        &LlmConfig {
            api_key: "test".to_string(),
            max_retries: 0,
            ..Default::default()
        },
    ));
    let transcoder = Arc::new(RecordingTranscoder::default());

    let state = AppState::assemble(
        ApiConfig::default(),
        store,
        gateway,
        Arc::new(PromptLibrary::with_defaults()),
        Arc::clone(&transcoder) as Arc<dyn Transcoder>,
        PipelineConfig::default(),
        SchedulerConfig {
            max_concurrent_processing: capacity,
        },
    );

    ApiFixture {
        state,
        transcoder,
        _tmp: tmp,
    }
}

/// A minimal titled clip for seeding metadata files.
pub fn titled_clip(id: &str, start_s: u64, end_s: u64) -> TitledClip {
    TitledClip {
        clip: ScoredClip {
            timeline: TimelineItem {
                id: id.to_string(),
                topic: format!("topic {}", id),
                keywords: vec![],
                chunk_index: 0,
                start_time: SrtTime::from_secs(start_s),
                end_time: SrtTime::from_secs(end_s),
            },
            sub_scores: SubScores::default(),
            final_score: 0.9,
            recommend_reason: "reason".to_string(),
            content: vec![],
            cross_chunk_overlap: false,
        },
        generated_title: format!("title {}", id),
    }
}

/// Seed a project with produced clips (real files on disk) and one
/// collection record, mirroring a completed stage 6.
pub async fn seed_produced_project(
    state: &AppState,
    clip_ids: &[&str],
    collection_order: &[&str],
) -> (ProjectId, String) {
    let project = state
        .store
        .create_project("seeded", aclip_models::VideoCategory::Default)
        .await
        .unwrap();
    let paths = state.store.paths(&project.id);

    let mut records = Vec::new();
    for (i, id) in clip_ids.iter().enumerate() {
        let body = format!("<{}>", id);
        tokio::fs::write(paths.clip_video(id), &body).await.unwrap();
        records.push(ClipRecord {
            clip: titled_clip(id, i as u64 * 10, i as u64 * 10 + 5),
            artifact: ClipArtifact::new(
                PathBuf::from("output/clips").join(format!("{}.mp4", id)),
                5.0,
                body.len() as u64,
            ),
        });
    }
    state
        .store
        .write_clips_metadata(&project.id, &ClipsMetadata { clips: records })
        .await
        .unwrap();

    let collection = Collection::new(
        "Seeded",
        "seeded collection",
        collection_order.iter().map(|s| s.to_string()).collect(),
        CollectionKind::AiRecommended,
    );
    let collection_id = collection.id.to_string();
    state
        .store
        .write_collections_metadata(
            &project.id,
            &CollectionsMetadata {
                collections: vec![CollectionRecord {
                    collection,
                    artifact: None,
                }],
            },
        )
        .await
        .unwrap();

    (project.id, collection_id)
}
