//! The six-stage clip generation pipeline.
//!
//! Stage 1 extracts an outline from subtitle chunks, stage 2 localizes it
//! back onto cue timestamps, stage 3 scores candidate clips, stage 4 titles
//! the survivors, stage 5 clusters them into collections and stage 6
//! produces the physical media. Stages run strictly sequentially per
//! project; each persists one JSON output that the next stage loads.

pub mod config;
mod context;
mod error;
mod pipeline;
mod progress;
mod prompts;
mod stages;
mod transcode;

pub use config::{PipelineConfig, ScoreWeights};
pub use context::StageContext;
pub use error::{PipelineError, PipelineResult, StageError, StageResultExt};
pub use pipeline::{Pipeline, RunOutcome};
pub use progress::{null_sink, ProgressEvent, ProgressSink};
pub use prompts::PromptLibrary;
pub use stages::{stage_runner, Stage};
pub use transcode::{FfmpegTranscoder, Transcoder};
