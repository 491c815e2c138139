//! Error types for the pipeline.

use aclip_llm::LlmError;
use aclip_media::MediaError;
use aclip_models::StageId;
use aclip_store::StoreError;
use aclip_subtitle::SubtitleError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure inside a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage produced no valid output at all.
    #[error("stage produced no valid output")]
    Empty,

    /// Cancellation observed at a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// A structural problem in the stage's input or output.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),
}

impl StageError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Whether this failure is a cancellation rather than an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            StageError::Cancelled | StageError::Media(MediaError::Cancelled)
        )
    }
}

/// Pipeline-level failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage halted the pipeline; the project transitions to `error` and
    /// earlier stages' outputs stay on disk for resume.
    #[error("{stage} failed: {cause}")]
    StageFailed {
        stage: StageId,
        #[source]
        cause: StageError,
    },

    /// A stage produced nothing valid.
    #[error("{0} produced no output")]
    StageEmpty(StageId),

    /// Cancelled mid-run; the interrupted stage's partial output is removed.
    #[error("cancelled during {0}")]
    Cancelled(StageId),

    /// `resume` was asked to skip a stage whose output is missing or does
    /// not validate.
    #[error("cannot resume: output of {0} is missing or invalid")]
    MissingPrerequisite(StageId),

    /// The requested stage index is outside 1..=6.
    #[error("invalid stage index {0}")]
    InvalidStage(u8),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Wrap a stage failure, folding the special cases into their own
    /// variants.
    pub fn from_stage(stage: StageId, cause: StageError) -> Self {
        if cause.is_cancelled() {
            return PipelineError::Cancelled(stage);
        }
        match cause {
            StageError::Empty => PipelineError::StageEmpty(stage),
            cause => PipelineError::StageFailed { stage, cause },
        }
    }

    /// The stage the pipeline stopped at, when one is recorded.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            PipelineError::StageFailed { stage, .. }
            | PipelineError::StageEmpty(stage)
            | PipelineError::Cancelled(stage)
            | PipelineError::MissingPrerequisite(stage) => Some(*stage),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled(_))
    }
}

/// Convenience for bubbling stage errors with their stage attached.
pub trait StageResultExt<T> {
    fn at_stage(self, stage: StageId) -> PipelineResult<T>;
}

impl<T> StageResultExt<T> for Result<T, StageError> {
    fn at_stage(self, stage: StageId) -> PipelineResult<T> {
        self.map_err(|e| PipelineError::from_stage(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_folds_to_stage_empty() {
        let e = PipelineError::from_stage(StageId::Outline, StageError::Empty);
        assert!(matches!(e, PipelineError::StageEmpty(StageId::Outline)));
    }

    #[test]
    fn test_cancellation_folds_to_cancelled() {
        let e = PipelineError::from_stage(StageId::Timeline, StageError::Cancelled);
        assert!(e.is_cancelled());
        assert_eq!(e.stage(), Some(StageId::Timeline));

        let e = PipelineError::from_stage(
            StageId::Video,
            StageError::Media(MediaError::Cancelled),
        );
        assert!(e.is_cancelled());
    }

    #[test]
    fn test_llm_failure_wraps() {
        let e = PipelineError::from_stage(
            StageId::Scoring,
            StageError::Llm(LlmError::Timeout(30)),
        );
        assert!(matches!(e, PipelineError::StageFailed { stage: StageId::Scoring, .. }));
    }
}
