//! Error types for subtitle handling.

use thiserror::Error;

/// Result type for subtitle operations.
pub type SubtitleResult<T> = Result<T, SubtitleError>;

/// Errors that can occur while parsing or chunking subtitles.
#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("subtitle file contains no parseable cues")]
    NoCues,

    #[error("invalid cue timing at block {block}: {detail}")]
    InvalidTiming { block: usize, detail: String },

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}
