//! Application state.

use std::sync::Arc;

use aclip_llm::{LlmConfig, LlmGateway};
use aclip_pipeline::{FfmpegTranscoder, Pipeline, PipelineConfig, PromptLibrary, Transcoder};
use aclip_scheduler::{SchedulerConfig, TaskScheduler};
use aclip_store::ProjectStore;

use crate::config::ApiConfig;
use crate::thumbs::ThumbnailCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<ProjectStore>,
    pub gateway: Arc<LlmGateway>,
    pub pipeline: Arc<Pipeline>,
    pub scheduler: Arc<TaskScheduler>,
    pub thumbnails: Arc<ThumbnailCache>,
    pub scheduler_capacity: usize,
}

impl AppState {
    /// Create production state: store on disk, gateway from env, ffmpeg
    /// transcoder.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = Arc::new(ProjectStore::open(&config.data_dir).await?);
        let gateway = Arc::new(LlmGateway::from_config(&LlmConfig::from_env()?)?);
        let prompts = Arc::new(PromptLibrary::load(&config.prompt_dir).await);
        let pipeline_config = PipelineConfig::from_env();
        let transcoder = Arc::new(FfmpegTranscoder::new(pipeline_config.transcode_parallelism));

        Ok(Self::assemble(
            config,
            store,
            gateway,
            prompts,
            transcoder,
            pipeline_config,
            SchedulerConfig::from_env(),
        ))
    }

    /// Wire up state from explicit collaborators. Tests use this with a
    /// scripted gateway and a fake transcoder.
    pub fn assemble(
        config: ApiConfig,
        store: Arc<ProjectStore>,
        gateway: Arc<LlmGateway>,
        prompts: Arc<PromptLibrary>,
        transcoder: Arc<dyn Transcoder>,
        pipeline_config: PipelineConfig,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let scheduler_capacity = scheduler_config.max_concurrent_processing;
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            prompts,
            transcoder,
            pipeline_config,
        ));
        let scheduler = TaskScheduler::new(Arc::clone(&pipeline), scheduler_config);

        Self {
            config,
            store,
            gateway,
            pipeline,
            scheduler,
            thumbnails: Arc::new(ThumbnailCache::new()),
            scheduler_capacity,
        }
    }
}
