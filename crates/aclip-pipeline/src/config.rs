//! Pipeline configuration.

use std::time::Duration;

/// Weights combining the five stage-3 sub-scores into `final_score`.
///
/// The weighting is configuration, never LLM output. Defaults favor the
/// opening hook and information density; overrides that do not sum to 1 are
/// renormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub hook: f64,
    pub info: f64,
    pub emotion: f64,
    pub share: f64,
    pub completeness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            hook: 0.30,
            info: 0.25,
            emotion: 0.15,
            share: 0.15,
            completeness: 0.15,
        }
    }
}

impl ScoreWeights {
    /// Create weights from environment overrides (`SCORE_W_HOOK`, ...).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            hook: env_f64("SCORE_W_HOOK", d.hook),
            info: env_f64("SCORE_W_INFO", d.info),
            emotion: env_f64("SCORE_W_EMOTION", d.emotion),
            share: env_f64("SCORE_W_SHARE", d.share),
            completeness: env_f64("SCORE_W_COMPLETENESS", d.completeness),
        }
        .normalized()
    }

    /// Scale the weights so they sum to 1. All-zero weights fall back to the
    /// defaults.
    pub fn normalized(self) -> Self {
        let sum = self.hook + self.info + self.emotion + self.share + self.completeness;
        if sum <= f64::EPSILON {
            return Self::default();
        }
        Self {
            hook: self.hook / sum,
            info: self.info / sum,
            emotion: self.emotion / sum,
            share: self.share / sum,
            completeness: self.completeness / sum,
        }
    }

    /// Weighted combination of sub-scores, clamped into [0, 1].
    pub fn combine(&self, scores: &aclip_models::SubScores) -> f64 {
        let s = scores.clamped();
        let total = self.hook * s.hook
            + self.info * s.info
            + self.emotion * s.emotion
            + self.share * s.share
            + self.completeness * s.completeness;
        total.clamp(0.0, 1.0)
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Pipeline tunables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Subtitle chunk character budget
    pub chunk_size: usize,
    /// Stage-3 cutoff; clips strictly below it are dropped
    pub min_score_threshold: f64,
    /// Stage-5 collection size cap
    pub max_clips_per_collection: usize,
    /// In-flight LLM calls per project in the fan-out stages
    pub llm_parallelism: usize,
    /// Concurrent transcode jobs in stage 6
    pub transcode_parallelism: usize,
    /// Per-job transcode timeout
    pub transcode_timeout: Duration,
    /// Sub-score weighting
    pub score_weights: ScoreWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            min_score_threshold: 0.7,
            max_clips_per_collection: 5,
            llm_parallelism: 3,
            transcode_parallelism: 2,
            transcode_timeout: Duration::from_secs(7200),
            score_weights: ScoreWeights::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            chunk_size: env_parse("CHUNK_SIZE", d.chunk_size),
            min_score_threshold: env_f64("MIN_SCORE_THRESHOLD", d.min_score_threshold),
            max_clips_per_collection: env_parse(
                "MAX_CLIPS_PER_COLLECTION",
                d.max_clips_per_collection,
            ),
            llm_parallelism: env_parse("LLM_PARALLELISM", d.llm_parallelism).max(1),
            transcode_parallelism: env_parse("TRANSCODE_PARALLELISM", d.transcode_parallelism)
                .max(1),
            transcode_timeout: Duration::from_secs(env_parse(
                "TRANSCODE_TIMEOUT_SECONDS",
                d.transcode_timeout.as_secs(),
            )),
            score_weights: ScoreWeights::from_env(),
        }
    }
}
