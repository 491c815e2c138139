//! The transcoder seam used by stage 6.
//!
//! Stage 6 drives media production through this trait so tests can replace
//! the external ffmpeg binary with a fake; the production implementation
//! delegates to `aclip-media`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aclip_models::{ClipArtifact, CollectionArtifact, SrtTime};
use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};

use aclip_media::{concat_clips, cut_clip, generate_thumbnail, MediaResult};

/// Media production operations stage 6 needs.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Cut `[start, end]` out of `source` into `output`.
    async fn cut(
        &self,
        source: &Path,
        output: &Path,
        start: SrtTime,
        end: SrtTime,
        timeout: Duration,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<ClipArtifact>;

    /// Concatenate `inputs` (in order) into `output`.
    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        work_dir: &Path,
        timeout: Duration,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<CollectionArtifact>;

    /// Generate a thumbnail for a produced clip.
    async fn thumbnail(&self, video: &Path, output: &Path) -> MediaResult<()>;
}

/// Production transcoder shelling out to ffmpeg.
///
/// Transcode jobs across ALL projects share one semaphore, so the global
/// transcode cap holds regardless of how many pipelines run concurrently.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    jobs: Arc<Semaphore>,
}

impl FfmpegTranscoder {
    pub fn new(max_parallel_jobs: usize) -> Self {
        Self {
            jobs: Arc::new(Semaphore::new(max_parallel_jobs.max(1))),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(2)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn cut(
        &self,
        source: &Path,
        output: &Path,
        start: SrtTime,
        end: SrtTime,
        timeout: Duration,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<ClipArtifact> {
        let _job = self.jobs.acquire().await.expect("transcode semaphore closed");
        cut_clip(source, output, start, end, timeout, cancel_rx).await
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        work_dir: &Path,
        timeout: Duration,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> MediaResult<CollectionArtifact> {
        let _job = self.jobs.acquire().await.expect("transcode semaphore closed");
        concat_clips(inputs, output, work_dir, timeout, cancel_rx).await
    }

    async fn thumbnail(&self, video: &Path, output: &Path) -> MediaResult<()> {
        generate_thumbnail(video, output).await
    }
}
