//! Thumbnail generation.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

const THUMBNAIL_SCALE_WIDTH: u32 = 480;
const THUMBNAIL_TIMESTAMP: &str = "00:00:01";

/// Generate a JPEG thumbnail from the first second of a video file.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);

    let cmd = FfmpegCommand::new(video_path.as_ref(), output_path.as_ref())
        .input_arg("-ss")
        .input_arg(THUMBNAIL_TIMESTAMP)
        .single_frame()
        .video_filter(&filter);

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_command_shape() {
        let cmd = FfmpegCommand::new("in.mp4", "out.jpg")
            .input_arg("-ss")
            .input_arg(THUMBNAIL_TIMESTAMP)
            .single_frame()
            .video_filter(format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH));
        let joined = cmd.build_args().join(" ");
        assert!(joined.contains("-ss 00:00:01 -i in.mp4"));
        assert!(joined.contains("-vframes 1"));
        assert!(joined.contains("scale=480:-2"));
    }
}
