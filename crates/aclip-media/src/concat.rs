//! Collection concatenation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aclip_models::CollectionArtifact;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::cut::remove_partial;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Concatenate clip files into one collection video, preserving input order.
///
/// When every input shares codec parameters the join is lossless via the
/// concat demuxer with stream copy; otherwise the inputs are re-encoded
/// uniformly through the concat filter. `work_dir` receives the temporary
/// list file. Partial outputs are removed on failure.
pub async fn concat_clips(
    inputs: &[PathBuf],
    output: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    timeout: Duration,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<CollectionArtifact> {
    let output = output.as_ref();
    let work_dir = work_dir.as_ref();

    if inputs.is_empty() {
        return Err(MediaError::InvalidMedia(
            "cannot concatenate zero inputs".to_string(),
        ));
    }
    for input in inputs {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    // Probe all inputs to decide between lossless and re-encode paths.
    let mut infos = Vec::with_capacity(inputs.len());
    for input in inputs {
        infos.push(probe_media(input).await?);
    }
    let lossless = infos
        .windows(2)
        .all(|pair| pair[0].concat_compatible(&pair[1]));

    info!(
        inputs = inputs.len(),
        lossless,
        output = %output.display(),
        "concatenating collection"
    );

    let mut runner = FfmpegRunner::new().with_timeout(timeout);
    if let Some(rx) = cancel_rx {
        runner = runner.with_cancel(rx);
    }

    let result = if lossless {
        concat_demuxer(inputs, output, work_dir, &runner).await
    } else {
        concat_filter(inputs, output, &runner).await
    };

    if let Err(e) = result {
        remove_partial(output).await;
        return Err(e);
    }

    let probed = probe_media(output).await?;
    Ok(CollectionArtifact::new(output, probed.duration, probed.size))
}

/// Lossless join via the concat demuxer (`-f concat -safe 0 -c copy`).
async fn concat_demuxer(
    inputs: &[PathBuf],
    output: &Path,
    work_dir: &Path,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let list_path = work_dir.join(format!(
        "concat_{}.txt",
        output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "list".to_string())
    ));

    let mut list = String::new();
    for input in inputs {
        // The demuxer's quoting rule: single quotes, embedded quotes closed,
        // escaped and reopened.
        let escaped = input.to_string_lossy().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    tokio::fs::write(&list_path, list).await?;

    let cmd = FfmpegCommand::new(&list_path, output)
        .input_arg("-f")
        .input_arg("concat")
        .input_arg("-safe")
        .input_arg("0")
        .stream_copy()
        .faststart();

    let result = runner.run(&cmd).await;

    if let Err(e) = tokio::fs::remove_file(&list_path).await {
        warn!("failed to remove concat list: {}", e);
    }

    result
}

/// Re-encode join via the concat filter, normalizing codec parameters.
async fn concat_filter(
    inputs: &[PathBuf],
    output: &Path,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let mut cmd = FfmpegCommand::new(&inputs[0], output);
    for input in &inputs[1..] {
        cmd = cmd.add_input(input);
    }

    let filter = (0..inputs.len())
        .map(|i| format!("[{i}:v][{i}:a]"))
        .collect::<String>()
        + &format!("concat=n={}:v=1:a=1[v][a]", inputs.len());

    cmd = cmd
        .filter_complex(filter)
        .output_args(["-map", "[v]", "-map", "[a]"])
        .video_codec("libx264")
        .output_args(["-preset", "veryfast", "-crf", "23"])
        .audio_codec("aac")
        .faststart();

    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_inputs_rejected() {
        let err = concat_clips(
            &[],
            "out.mp4",
            "/tmp",
            Duration::from_secs(60),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia(_)));
    }

    #[tokio::test]
    async fn test_missing_input_rejected() {
        let err = concat_clips(
            &[PathBuf::from("/no/such/file.mp4")],
            "out.mp4",
            "/tmp",
            Duration::from_secs(60),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_demuxer_list_escaping() {
        let path = PathBuf::from("/data/it's here.mp4");
        let escaped = path.to_string_lossy().replace('\'', "'\\''");
        assert_eq!(escaped, "/data/it'\\''s here.mp4");
    }
}
