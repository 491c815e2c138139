//! Media production for the clip pipeline.
//!
//! Wraps the external `ffmpeg`/`ffprobe` binaries for cutting clips,
//! concatenating collections and probing results, plus a `yt-dlp` wrapper
//! that fetches remote source video and subtitles.

mod command;
mod concat;
mod cut;
mod download;
mod error;
mod probe;
mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use concat::concat_clips;
pub use cut::cut_clip;
pub use download::{download_source, DownloadedSource};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_media, MediaInfo};
pub use thumbnail::generate_thumbnail;
