//! Whole-project output packaging.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{ApiError, ApiResult};

/// Package a project's `output/` tree into an in-memory zip archive.
///
/// Runs on the blocking pool; metadata JSON and produced media are included,
/// temp files are not.
pub async fn package_outputs(output_dir: PathBuf) -> ApiResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || build_zip(&output_dir))
        .await
        .map_err(|e| ApiError::internal(format!("archive task panicked: {}", e)))?
}

fn build_zip(output_dir: &Path) -> ApiResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        // Media is already compressed; store instead of deflating it.
        add_dir(&mut zip, output_dir, Path::new(""))?;
        zip.finish()
            .map_err(|e| ApiError::internal(format!("failed to finish archive: {}", e)))?;
    }
    Ok(buffer.into_inner())
}

fn add_dir(
    zip: &mut ZipWriter<&mut Cursor<Vec<u8>>>,
    dir: &Path,
    prefix: &Path,
) -> ApiResult<()> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ApiError::internal(format!("cannot read {}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| ApiError::internal(e.to_string()))?;
        let path = entry.path();
        let name = prefix.join(entry.file_name());
        let name_str = name.to_string_lossy().replace('\\', "/");

        if path.is_dir() {
            add_dir(zip, &path, &name)?;
        } else {
            let options = if is_compressed_media(&path) {
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
            } else {
                SimpleFileOptions::default()
            };
            debug!(file = %name_str, "adding to archive");
            zip.start_file(&name_str, options)
                .map_err(|e| ApiError::internal(e.to_string()))?;
            let bytes = std::fs::read(&path).map_err(|e| ApiError::internal(e.to_string()))?;
            zip.write_all(&bytes)
                .map_err(|e| ApiError::internal(e.to_string()))?;
        }
    }
    Ok(())
}

fn is_compressed_media(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("mp4" | "jpg" | "jpeg" | "png")
    )
}
