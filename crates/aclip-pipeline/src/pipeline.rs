//! Pipeline orchestration: sequential stages over one project.

use std::sync::Arc;

use aclip_llm::LlmGateway;
use aclip_models::{
    CollectionRecord, ProjectId, Stage1Result, Stage2Result, Stage3Result, Stage4Result,
    Stage5Result, StageId, TOTAL_STAGES,
};
use aclip_store::ProjectStore;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::context::StageContext;
use crate::error::{PipelineError, PipelineResult, StageError};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::prompts::PromptLibrary;
use crate::stages::stage_runner;
use crate::transcode::Transcoder;

/// How a pipeline run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All six stages finished; project is `completed`.
    Completed,
    /// Cancellation observed; project is `cancelled`, the interrupted
    /// stage's output removed.
    Cancelled,
}

/// The six-stage pipeline over a single project.
pub struct Pipeline {
    store: Arc<ProjectStore>,
    gateway: Arc<LlmGateway>,
    prompts: Arc<PromptLibrary>,
    transcoder: Arc<dyn Transcoder>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<ProjectStore>,
        gateway: Arc<LlmGateway>,
        prompts: Arc<PromptLibrary>,
        transcoder: Arc<dyn Transcoder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            prompts,
            transcoder,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline from stage 1.
    pub async fn start(
        &self,
        project_id: &ProjectId,
        cancel_rx: watch::Receiver<bool>,
        progress: ProgressSink,
    ) -> PipelineResult<RunOutcome> {
        self.run_from(project_id, 1, cancel_rx, progress).await
    }

    /// Resume from `from_stage`, requiring that stages `1..from_stage` have
    /// valid outputs on disk.
    pub async fn resume(
        &self,
        project_id: &ProjectId,
        from_stage: u8,
        cancel_rx: watch::Receiver<bool>,
        progress: ProgressSink,
    ) -> PipelineResult<RunOutcome> {
        self.run_from(project_id, from_stage, cancel_rx, progress)
            .await
    }

    /// Retry from the last failed stage, or stage 1 when none is recorded.
    pub async fn retry(
        &self,
        project_id: &ProjectId,
        cancel_rx: watch::Receiver<bool>,
        progress: ProgressSink,
    ) -> PipelineResult<RunOutcome> {
        let project = self.store.load_project(project_id).await?;
        let from_stage = match project.status {
            aclip_models::ProjectStatus::Error => project.current_stage,
            _ => 1,
        };
        self.run_from(project_id, from_stage, cancel_rx, progress)
            .await
    }

    async fn run_from(
        &self,
        project_id: &ProjectId,
        from_stage: u8,
        cancel_rx: watch::Receiver<bool>,
        progress: ProgressSink,
    ) -> PipelineResult<RunOutcome> {
        let first = StageId::from_index(from_stage)
            .ok_or(PipelineError::InvalidStage(from_stage))?;

        if first.index() > 1 {
            self.validate_prerequisites(project_id, first).await?;
        }

        // Mark the project processing under its mutation lock.
        {
            let _guard = self.store.lock_project(project_id).await;
            let mut project = self.store.load_project(project_id).await?;
            project.start_processing(first.index());
            self.store.save_project(&project).await?;
        }

        let log = self.store.log(project_id);
        log.append(format!("pipeline starting at stage {}", first.index()));
        info!(project_id = %project_id, from_stage = first.index(), "pipeline starting");

        for index in first.index()..=TOTAL_STAGES {
            let stage = StageId::from_index(index).expect("index in range");

            // Stage-boundary cancellation point.
            if *cancel_rx.borrow() {
                return self.finish_cancelled(project_id, stage, &log).await;
            }

            (*progress)(ProgressEvent::entering(project_id.clone(), stage));
            log.append(format!("entering {}", stage));

            {
                let _guard = self.store.lock_project(project_id).await;
                let mut project = self.store.load_project(project_id).await?;
                project.current_stage = index;
                self.store.save_project(&project).await?;
            }

            let ctx = StageContext {
                project: self.store.load_project(project_id).await?,
                store: Arc::clone(&self.store),
                gateway: Arc::clone(&self.gateway),
                prompts: Arc::clone(&self.prompts),
                transcoder: Arc::clone(&self.transcoder),
                config: self.config.clone(),
                cancel_rx: cancel_rx.clone(),
                progress: Arc::clone(&progress),
                log: log.clone(),
            };

            match stage_runner(stage).run(&ctx).await {
                Ok(()) => {}
                Err(cause) if cause.is_cancelled() => {
                    return self.finish_cancelled(project_id, stage, &log).await;
                }
                Err(cause) => {
                    return self.finish_failed(project_id, stage, cause, &log).await;
                }
            }
        }

        {
            let _guard = self.store.lock_project(project_id).await;
            let mut project = self.store.load_project(project_id).await?;
            project.complete();
            self.store.save_project(&project).await?;
        }

        (*progress)(ProgressEvent::finished(project_id.clone()));
        log.append("pipeline completed");
        info!(project_id = %project_id, "pipeline completed");
        Ok(RunOutcome::Completed)
    }

    /// Rebuild one collection's artifact from the existing clip artifacts
    /// and refresh `collections_metadata.json`. Used by the regeneration
    /// endpoint after a user reorders or edits a collection.
    pub async fn regenerate_collection(
        &self,
        project_id: &ProjectId,
        collection_id: &str,
        cancel_rx: watch::Receiver<bool>,
    ) -> PipelineResult<()> {
        let clips = self.store.read_clips_metadata(project_id).await?;
        let mut collections = self.store.read_collections_metadata(project_id).await?;

        let record = collections
            .get(collection_id)
            .ok_or_else(|| {
                PipelineError::Store(aclip_store::StoreError::ProjectNotFound(format!(
                    "collection {} in project {}",
                    collection_id, project_id
                )))
            })?
            .clone();

        let paths = self.store.paths(project_id);
        let inputs: Vec<std::path::PathBuf> = record
            .collection
            .clip_ids
            .iter()
            .filter(|id| clips.get(id).is_some())
            .map(|id| paths.clip_video(id))
            .collect();

        if inputs.is_empty() {
            return Err(PipelineError::from_stage(
                StageId::Video,
                StageError::invalid(format!(
                    "collection '{}' references no producible clips",
                    record.collection.title
                )),
            ));
        }

        let output = paths.collection_video(collection_id);
        let mut artifact = self
            .transcoder
            .concat(
                &inputs,
                &output,
                &paths.temp_dir(),
                self.config.transcode_timeout,
                Some(cancel_rx),
            )
            .await
            .map_err(|e| PipelineError::from_stage(StageId::Video, e.into()))?;
        artifact.path = std::path::PathBuf::from("output/collections")
            .join(format!("{}.mp4", collection_id));

        let _guard = self.store.lock_project(project_id).await;
        if let Some(existing) = collections.get_mut(collection_id) {
            *existing = CollectionRecord {
                collection: existing.collection.clone(),
                artifact: Some(artifact),
            };
        }
        self.store
            .write_collections_metadata(project_id, &collections)
            .await?;
        info!(project_id = %project_id, collection_id, "collection regenerated");
        Ok(())
    }

    /// Validate that every stage before `first` left a parseable output.
    async fn validate_prerequisites(
        &self,
        project_id: &ProjectId,
        first: StageId,
    ) -> PipelineResult<()> {
        for index in 1..first.index() {
            let stage = StageId::from_index(index).expect("index in range");
            let valid = match stage {
                StageId::Outline => self
                    .store
                    .read_stage_result::<Stage1Result>(project_id)
                    .await
                    .is_ok(),
                StageId::Timeline => self
                    .store
                    .read_stage_result::<Stage2Result>(project_id)
                    .await
                    .is_ok(),
                StageId::Scoring => self
                    .store
                    .read_stage_result::<Stage3Result>(project_id)
                    .await
                    .is_ok(),
                StageId::Title => self
                    .store
                    .read_stage_result::<Stage4Result>(project_id)
                    .await
                    .is_ok(),
                StageId::Clustering => self
                    .store
                    .read_stage_result::<Stage5Result>(project_id)
                    .await
                    .is_ok(),
                StageId::Video => true,
            };
            if !valid {
                return Err(PipelineError::MissingPrerequisite(stage));
            }
        }
        Ok(())
    }

    /// Terminal handling for cancellation: drop the interrupted stage's
    /// partial output, keep everything earlier.
    async fn finish_cancelled(
        &self,
        project_id: &ProjectId,
        stage: StageId,
        log: &aclip_store::ProjectLog,
    ) -> PipelineResult<RunOutcome> {
        warn!(project_id = %project_id, %stage, "pipeline cancelled");
        log.append(format!("cancelled during {}", stage));

        if let Err(e) = self.store.remove_stage_result(project_id, stage).await {
            warn!(project_id = %project_id, "failed to remove partial stage output: {}", e);
        }

        let _guard = self.store.lock_project(project_id).await;
        let mut project = self.store.load_project(project_id).await?;
        project.cancel(stage.index());
        self.store.save_project(&project).await?;
        Ok(RunOutcome::Cancelled)
    }

    /// Terminal handling for failure: record the cause atomically, leave
    /// earlier stages' outputs for resume.
    async fn finish_failed(
        &self,
        project_id: &ProjectId,
        stage: StageId,
        cause: StageError,
        log: &aclip_store::ProjectLog,
    ) -> PipelineResult<RunOutcome> {
        let failure = PipelineError::from_stage(stage, cause);
        error!(project_id = %project_id, %stage, "pipeline failed: {}", failure);
        log.append(format!("failed: {}", failure));

        let _guard = self.store.lock_project(project_id).await;
        let mut project = self.store.load_project(project_id).await?;
        project.fail(stage.index(), failure.to_string());
        self.store.save_project(&project).await?;
        Err(failure)
    }
}
