//! Shared fixtures: a scripted provider keyed on prompt markers and a fake
//! transcoder that produces files without ffmpeg.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aclip_llm::{ChatProvider, ChatResponse, LlmConfig, LlmError, LlmGateway, LlmResult, TokenUsage};
use aclip_media::{MediaError, MediaResult};
use aclip_models::{ClipArtifact, CollectionArtifact, Project, SrtTime, VideoCategory};
use aclip_pipeline::{Pipeline, PipelineConfig, PromptLibrary, ScoreWeights, Transcoder};
use aclip_store::ProjectStore;
use async_trait::async_trait;
use tokio::sync::watch;

/// The three-cue SRT from the reference scenarios.
pub const THREE_CUE_SRT: &str = "1\n00:00:00,000 --> 00:00:05,000\nA\n\n2\n00:00:05,000 --> 00:00:10,000\nB\n\n3\n00:00:10,000 --> 00:00:15,000\nC\n";

/// What the scripted provider does when a prompt matches a marker.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Hang,
}

/// Routes prompts to replies by distinctive template substrings.
pub struct ScriptedProvider {
    replies: Mutex<HashMap<&'static str, Reply>>,
}

/// Markers identifying each stage's prompt.
pub const OUTLINE_MARK: &str = "Identify the distinct topics";
pub const TIMELINE_MARK: &str = "find the span of subtitle lines";
pub const SCORING_MARK: &str = "Rate every clip";
pub const TITLE_MARK: &str = "one publish-ready title";
pub const CLUSTER_MARK: &str = "Propose collections";

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(HashMap::new()),
        })
    }

    pub fn on(self: &Arc<Self>, marker: &'static str, reply: Reply) -> Arc<Self> {
        self.replies.lock().unwrap().insert(marker, reply);
        Arc::clone(self)
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, prompt: &str, _timeout: Duration) -> LlmResult<ChatResponse> {
        let reply = {
            let replies = self.replies.lock().unwrap();
            replies
                .iter()
                .find(|(marker, _)| prompt.contains(**marker))
                .map(|(_, r)| r.clone())
        };
        match reply {
            Some(Reply::Text(text)) => Ok(ChatResponse {
                text,
                usage: TokenUsage::new(10, 5),
            }),
            Some(Reply::Fail) => Err(LlmError::unavailable("scripted outage")),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(LlmError::Timeout(30))
            }
            None => Err(LlmError::invalid_output(format!(
                "no scripted reply matches prompt: {}",
                &prompt[..prompt.len().min(80)]
            ))),
        }
    }
}

/// Transcoder that copies bytes instead of invoking ffmpeg and records the
/// order of concat inputs.
#[derive(Default)]
pub struct FakeTranscoder {
    pub concat_calls: Mutex<Vec<Vec<PathBuf>>>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn cut(
        &self,
        source: &Path,
        output: &Path,
        start: SrtTime,
        end: SrtTime,
        _timeout: Duration,
        _cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<ClipArtifact> {
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }
        let body = format!("clip {} {}", start, end);
        tokio::fs::write(output, &body).await?;
        let duration = end.saturating_sub(start).as_secs_f64();
        Ok(ClipArtifact::new(output, duration, body.len() as u64))
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

/// Pipeline config with hook-only weighting so `final_score` equals the
/// hook sub-score exactly, keeping threshold tests free of float noise.
pub fn hook_only_config() -> PipelineConfig {
    PipelineConfig {
        score_weights: ScoreWeights {
            hook: 1.0,
            info: 0.0,
            emotion: 0.0,
            share: 0.0,
            completeness: 0.0,
        },
        ..PipelineConfig::default()
    }
}

pub struct Fixture {
    pub store: Arc<ProjectStore>,
    pub pipeline: Arc<Pipeline>,
    pub transcoder: Arc<FakeTranscoder>,
    pub project: Project,
    // Held for the fixture's lifetime; the directory dies with it.
    _tmp: tempfile::TempDir,
}

/// Build a store with one project (three-cue SRT, fake video) and a
/// pipeline over the scripted provider and fake transcoder.
pub async fn fixture(provider: Arc<ScriptedProvider>, config: PipelineConfig) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(ProjectStore::open(tmp.path()).await.unwrap());
    let project = store
        .create_project("scenario", VideoCategory::Default)
        .await
        .unwrap();

    let paths = store.paths(&project.id);
    tokio::fs::write(paths.input_video(), b"fake mp4 bytes")
        .await
        .unwrap();
    tokio::fs::write(paths.input_srt(), THREE_CUE_SRT)
        .await
        .unwrap();

    let gateway = Arc::new(LlmGateway::with_provider(
        provider,
        &LlmConfig {
            api_key: "test".to_string(),
            max_retries: 0,
            ..Default::default()
        },
    ));

    let transcoder = Arc::new(FakeTranscoder::default());
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&store),
        gateway,
        Arc::new(PromptLibrary::with_defaults()),
        Arc::clone(&transcoder) as Arc<dyn Transcoder>,
        config,
    ));

    Fixture {
        store,
        pipeline,
        transcoder,
        project,
        _tmp: tmp,
    }
}

/// Uniform sub-scores JSON fragment.
pub fn scores(v: f64) -> String {
    format!(
        r#"{{"hook": {v}, "info": {v}, "emotion": {v}, "share": {v}, "completeness": {v}}}"#
    )
}

/// The scripted replies for the reference happy path: two outline topics,
/// one surviving clip, no collections.
pub fn happy_path_provider(o1_hook: f64, o2_hook: f64) -> Arc<ScriptedProvider> {
    ScriptedProvider::new()
        .on(
            OUTLINE_MARK,
            Reply::Text(
                r#"[{"topic": "AB", "keywords": ["ab"]}, {"topic": "C", "keywords": []}]"#
                    .to_string(),
            ),
        )
        .on(
            TIMELINE_MARK,
            Reply::Text(
                r#"[
                    {"id": "chunk0_o1", "start_time": "4.8", "end_time": "5.2"},
                    {"id": "chunk0_o2", "start_time": "00:00:10,000", "end_time": "00:00:15,000"}
                ]"#
                .to_string(),
            ),
        )
        .on(
            SCORING_MARK,
            Reply::Text(format!(
                r#"[
                    {{"id": "chunk0_o1", "scores": {}, "recommend_reason": "strong", "content": ["a", "b"]}},
                    {{"id": "chunk0_o2", "scores": {}, "recommend_reason": "weak", "content": []}}
                ]"#,
                scores(o1_hook),
                scores(o2_hook)
            )),
        )
        .on(TITLE_MARK, Reply::Text(r#"{"title": "AB Highlight"}"#.to_string()))
        .on(CLUSTER_MARK, Reply::Text("[]".to_string()))
}
