//! The bounded-concurrency task scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use aclip_models::{ProjectId, StageId};
use aclip_pipeline::{Pipeline, PipelineError, ProgressEvent, RunOutcome};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::status::{StatusBoard, TaskState};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Admission cap: projects in stage execution simultaneously
    pub max_concurrent_processing: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_processing: 2,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_processing: std::env::var("MAX_CONCURRENT_PROCESSING")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(2),
        }
    }
}

/// What kind of pipeline work a submission asks for.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Full run from stage 1
    Start,
    /// Resume from a specific stage
    Resume { from_stage: u8 },
    /// Retry from the last failed stage
    Retry,
    /// Rebuild one collection's artifact
    RegenerateCollection { collection_id: String },
}

impl TaskKind {
    /// The stage the task will enter first, for the initial status entry.
    fn initial_stage(&self) -> StageId {
        match self {
            TaskKind::Start | TaskKind::Retry => StageId::Outline,
            TaskKind::Resume { from_stage } => {
                StageId::from_index(*from_stage).unwrap_or(StageId::Outline)
            }
            TaskKind::RegenerateCollection { .. } => StageId::Video,
        }
    }
}

/// Admits, runs and cancels pipeline tasks.
pub struct TaskScheduler {
    pipeline: Arc<Pipeline>,
    board: Arc<StatusBoard>,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    cancel_senders: std::sync::Mutex<HashMap<ProjectId, watch::Sender<bool>>>,
}

impl TaskScheduler {
    pub fn new(pipeline: Arc<Pipeline>, config: SchedulerConfig) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            board: Arc::new(StatusBoard::new()),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_processing)),
            capacity: config.max_concurrent_processing,
            cancel_senders: std::sync::Mutex::new(HashMap::new()),
        })
    }

    pub fn board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.board)
    }

    pub fn stats(&self) -> crate::status::SchedulerStats {
        self.board.stats(self.capacity)
    }

    /// Admission check: an available slot or `SystemBusy`, with no state
    /// change on rejection.
    fn try_admit(&self) -> SchedulerResult<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map_err(|_| SchedulerError::SystemBusy {
                running: self.capacity - self.semaphore.available_permits(),
                cap: self.capacity,
            })
    }

    /// Submit a task for a project. Rejects immediately when the cap is hit
    /// or the project already has an in-flight task; otherwise the task runs
    /// to a terminal state in the background.
    pub fn submit(self: &Arc<Self>, project_id: ProjectId, kind: TaskKind) -> SchedulerResult<()> {
        if self.board.is_running(&project_id) {
            return Err(SchedulerError::AlreadyProcessing(project_id.to_string()));
        }

        let permit = self.try_admit()?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancel_senders
            .lock()
            .expect("cancel sender map poisoned")
            .insert(project_id.clone(), cancel_tx);

        // Mark running before returning so a duplicate submit is rejected.
        self.board.record_progress(ProgressEvent::entering(
            project_id.clone(),
            kind.initial_stage(),
        ));

        info!(project_id = %project_id, ?kind, "task admitted");

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = permit;
            scheduler.execute(project_id, kind, cancel_rx).await;
        });

        Ok(())
    }

    /// Run one admitted task to its terminal state.
    async fn execute(
        self: Arc<Self>,
        project_id: ProjectId,
        kind: TaskKind,
        cancel_rx: watch::Receiver<bool>,
    ) {
        let board = Arc::clone(&self.board);
        let sink_board = Arc::clone(&self.board);
        let progress: aclip_pipeline::ProgressSink =
            Arc::new(move |event| sink_board.record_progress(event));

        let result = match &kind {
            TaskKind::Start => {
                self.pipeline
                    .start(&project_id, cancel_rx, progress)
                    .await
            }
            TaskKind::Resume { from_stage } => {
                self.pipeline
                    .resume(&project_id, *from_stage, cancel_rx, progress)
                    .await
            }
            TaskKind::Retry => self.pipeline.retry(&project_id, cancel_rx, progress).await,
            TaskKind::RegenerateCollection { collection_id } => self
                .pipeline
                .regenerate_collection(&project_id, collection_id, cancel_rx)
                .await
                .map(|()| RunOutcome::Completed),
        };

        match result {
            Ok(RunOutcome::Completed) => {
                info!(project_id = %project_id, "task completed");
                board.record_terminal(&project_id, TaskState::Completed, None);
            }
            Ok(RunOutcome::Cancelled) => {
                info!(project_id = %project_id, "task cancelled");
                board.record_terminal(&project_id, TaskState::Cancelled, None);
            }
            Err(e) if matches!(e, PipelineError::Cancelled(_)) => {
                board.record_terminal(&project_id, TaskState::Cancelled, None);
            }
            Err(e) => {
                error!(project_id = %project_id, "task failed: {}", e);
                board.record_terminal(&project_id, TaskState::Failed, Some(e.to_string()));
            }
        }

        self.cancel_senders
            .lock()
            .expect("cancel sender map poisoned")
            .remove(&project_id);
    }

    /// Request cooperative cancellation of a project's running task.
    pub fn cancel(&self, project_id: &ProjectId) -> SchedulerResult<()> {
        let senders = self
            .cancel_senders
            .lock()
            .expect("cancel sender map poisoned");
        match senders.get(project_id) {
            Some(sender) => {
                info!(project_id = %project_id, "cancellation requested");
                let _ = sender.send(true);
                Ok(())
            }
            None => Err(SchedulerError::NotRunning(project_id.to_string())),
        }
    }

    /// Drop every trace of a project: cancel a running task if any, then
    /// evict its status entry. Part of the delete cascade.
    pub fn evict(&self, project_id: &ProjectId) {
        if self.cancel(project_id).is_ok() {
            warn!(project_id = %project_id, "evicting project with running task");
        }
        self.board.remove(project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclip_llm::{ChatProvider, ChatResponse, LlmConfig, LlmGateway, LlmResult};
    use aclip_pipeline::{FfmpegTranscoder, PipelineConfig, PromptLibrary};
    use aclip_store::ProjectStore;

    /// Provider that must never be reached; admission tests issue no LLM
    /// calls.
    struct NeverProvider;

    #[async_trait::async_trait]
    impl ChatProvider for NeverProvider {
        fn name(&self) -> &'static str {
            "never"
        }

        async fn chat(
            &self,
            _prompt: &str,
            _timeout: std::time::Duration,
        ) -> LlmResult<ChatResponse> {
            unreachable!("admission tests issue no LLM calls")
        }
    }

    async fn scheduler_with_capacity(n: usize) -> (tempfile::TempDir, Arc<TaskScheduler>) {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(ProjectStore::open(tmp.path()).await.unwrap());
        let gateway = Arc::new(LlmGateway::with_provider(
            Arc::new(NeverProvider),
            &LlmConfig {
                api_key: "test".to_string(),
                ..Default::default()
            },
        ));
        let pipeline = Arc::new(Pipeline::new(
            store,
            gateway,
            Arc::new(PromptLibrary::with_defaults()),
            Arc::new(FfmpegTranscoder::default()),
            PipelineConfig::default(),
        ));
        let scheduler = TaskScheduler::new(
            pipeline,
            SchedulerConfig {
                max_concurrent_processing: n,
            },
        );
        (tmp, scheduler)
    }

    #[tokio::test]
    async fn test_admission_cap() {
        let (_tmp, scheduler) = scheduler_with_capacity(2).await;

        let p1 = scheduler.try_admit().unwrap();
        let _p2 = scheduler.try_admit().unwrap();

        let err = scheduler.try_admit().unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::SystemBusy { running: 2, cap: 2 }
        ));

        drop(p1);
        assert!(scheduler.try_admit().is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_submit_rejected() {
        let (_tmp, scheduler) = scheduler_with_capacity(2).await;
        let id = ProjectId::from_string("busy");

        // Simulate an in-flight task.
        scheduler
            .board
            .record_progress(ProgressEvent::entering(id.clone(), StageId::Outline));

        let err = scheduler.submit(id, TaskKind::Start).unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyProcessing(_)));
    }

    #[tokio::test]
    async fn test_cancel_without_task() {
        let (_tmp, scheduler) = scheduler_with_capacity(1).await;
        let err = scheduler
            .cancel(&ProjectId::from_string("ghost"))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_evict_removes_status() {
        let (_tmp, scheduler) = scheduler_with_capacity(1).await;
        let id = ProjectId::from_string("p");
        scheduler
            .board
            .record_terminal(&id, TaskState::Completed, None);
        scheduler.evict(&id);
        assert!(scheduler.board.get(&id).is_none());
    }
}
