//! Clip cutting.

use std::path::Path;
use std::time::Duration;

use aclip_models::{ClipArtifact, SrtTime};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Cut `[start, end]` out of `source` into `output`.
///
/// Tries a stream copy first (fast, lossless); when the copy fails, for
/// example because the cut lands mid-GOP in a container that cannot carry
/// it, falls back to a re-encode. Either way the output is seekable
/// (`+faststart`) and probed for the returned artifact record. A partial
/// output file is removed on failure.
pub async fn cut_clip(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: SrtTime,
    end: SrtTime,
    timeout: Duration,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<ClipArtifact> {
    let source = source.as_ref();
    let output = output.as_ref();

    if end <= start {
        return Err(MediaError::InvalidMedia(format!(
            "clip span is empty: {} >= {}",
            start, end
        )));
    }

    let start_secs = start.as_secs_f64();
    let duration = end.saturating_sub(start).as_secs_f64();

    info!(
        source = %source.display(),
        output = %output.display(),
        start = %start,
        end = %end,
        "cutting clip"
    );

    let runner = runner_with(timeout, cancel_rx.clone());
    let copy_cmd = FfmpegCommand::new(source, output)
        .seek(start_secs)
        .duration(duration)
        .stream_copy()
        .output_arg("-avoid_negative_ts")
        .output_arg("make_zero")
        .faststart();

    let copy_result = runner.run(&copy_cmd).await;

    if let Err(e) = copy_result {
        match e {
            MediaError::Cancelled | MediaError::Timeout(_) => {
                remove_partial(output).await;
                return Err(e);
            }
            _ => {
                warn!("stream copy failed, re-encoding: {}", e);
                remove_partial(output).await;

                let encode_cmd = FfmpegCommand::new(source, output)
                    .seek(start_secs)
                    .duration(duration)
                    .video_codec("libx264")
                    .output_arg("-preset")
                    .output_arg("veryfast")
                    .output_arg("-crf")
                    .output_arg("23")
                    .audio_codec("aac")
                    .faststart();

                let runner = runner_with(timeout, cancel_rx);
                if let Err(e) = runner.run(&encode_cmd).await {
                    remove_partial(output).await;
                    return Err(e);
                }
            }
        }
    }

    let info = probe_media(output).await?;
    Ok(ClipArtifact::new(output, info.duration, info.size))
}

fn runner_with(timeout: Duration, cancel_rx: Option<watch::Receiver<bool>>) -> FfmpegRunner {
    let mut runner = FfmpegRunner::new().with_timeout(timeout);
    if let Some(rx) = cancel_rx {
        runner = runner.with_cancel(rx);
    }
    runner
}

pub(crate) async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "failed to remove partial output: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_span_rejected() {
        let err = cut_clip(
            "in.mp4",
            "out.mp4",
            SrtTime::from_secs(10),
            SrtTime::from_secs(10),
            Duration::from_secs(60),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia(_)));
    }

    #[tokio::test]
    async fn test_reversed_span_rejected() {
        let err = cut_clip(
            "in.mp4",
            "out.mp4",
            SrtTime::from_secs(20),
            SrtTime::from_secs(10),
            Duration::from_secs(60),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia(_)));
    }
}
