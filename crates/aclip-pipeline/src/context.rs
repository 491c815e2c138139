//! Shared state handed to each stage.

use std::sync::Arc;

use aclip_llm::{CompletionOptions, LlmGateway};
use aclip_models::{Project, SubtitleChunk};
use aclip_store::{ProjectLog, ProjectStore};
use aclip_subtitle::{parse_srt, SubtitleStore};
use futures::stream::{StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::sync::watch;

use crate::config::PipelineConfig;
use crate::error::StageError;
use crate::progress::ProgressSink;
use crate::prompts::PromptLibrary;
use crate::transcode::Transcoder;

/// Everything a stage needs: the project, its collaborators and the
/// cancellation signal.
pub struct StageContext {
    pub project: Project,
    pub store: Arc<ProjectStore>,
    pub gateway: Arc<LlmGateway>,
    pub prompts: Arc<PromptLibrary>,
    pub transcoder: Arc<dyn Transcoder>,
    pub config: PipelineConfig,
    pub cancel_rx: watch::Receiver<bool>,
    pub progress: ProgressSink,
    pub log: ProjectLog,
}

impl StageContext {
    /// Cancellation check, called at every suspension point.
    pub fn check_cancelled(&self) -> Result<(), StageError> {
        if *self.cancel_rx.borrow() {
            Err(StageError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Parse the project's subtitles and chunk them by the configured
    /// character budget. Deterministic, so stages 1-3 all see the same
    /// chunk boundaries.
    pub async fn load_chunks(&self) -> Result<Vec<SubtitleChunk>, StageError> {
        let srt_path = self.store.paths(&self.project.id).input_srt();
        let srt_text = tokio::fs::read_to_string(&srt_path)
            .await
            .map_err(aclip_store::StoreError::from)?;
        let cues = parse_srt(&srt_text)?;
        Ok(SubtitleStore::new(cues).chunk(self.config.chunk_size)?)
    }

    /// Issue a JSON-expecting completion for this project, abandoning the
    /// call as soon as cancellation is signalled.
    pub async fn complete_json(&self, prompt: &str) -> Result<Value, StageError> {
        self.check_cancelled()?;

        let call = self
            .gateway
            .complete(self.project.id.as_str(), prompt, CompletionOptions::json());
        tokio::pin!(call);

        let mut cancel_rx = self.cancel_rx.clone();
        let mut watching = true;
        loop {
            tokio::select! {
                result = &mut call => {
                    let completion = result?;
                    return Ok(completion.into_json()?);
                }
                changed = cancel_rx.changed(), if watching => {
                    match changed {
                        Ok(()) if *cancel_rx.borrow() => return Err(StageError::Cancelled),
                        Ok(()) => {}
                        // Sender dropped; fall back to just awaiting the call.
                        Err(_) => watching = false,
                    }
                }
            }
        }
    }

    /// Run one future per item with bounded concurrency, preserving item
    /// order in the results. The first error aborts the remaining work.
    pub async fn map_bounded<T, U, F, Fut>(
        &self,
        items: Vec<T>,
        concurrency: usize,
        f: F,
    ) -> Result<Vec<U>, StageError>
    where
        F: Fn(T) -> Fut,
        Fut: std::future::Future<Output = Result<U, StageError>>,
    {
        futures::stream::iter(items.into_iter().map(f))
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }
}
