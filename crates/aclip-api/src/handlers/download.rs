//! Media and archive downloads.

use aclip_models::ProjectId;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::archive::package_outputs;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub clip_id: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
}

/// GET /api/projects/:project_id/download?clip_id=…|collection_id=…
///
/// With a clip or collection id, serves that media file; with neither, a
/// zip archive of every output.
pub async fn download(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let id = ProjectId::from_string(project_id);
    state.store.load_project(&id).await?;
    let paths = state.store.paths(&id);

    match (query.clip_id, query.collection_id) {
        (Some(clip_id), None) => {
            validate_id_segment(&clip_id)?;
            let meta = state.store.read_clips_metadata(&id).await?;
            if meta.get(&clip_id).is_none() {
                return Err(ApiError::not_found(format!("clip {}", clip_id)));
            }
            serve_file(paths.clip_video(&clip_id), format!("{}.mp4", clip_id)).await
        }
        (None, Some(collection_id)) => {
            validate_id_segment(&collection_id)?;
            let meta = state.store.read_collections_metadata(&id).await?;
            if meta.get(&collection_id).is_none() {
                return Err(ApiError::not_found(format!("collection {}", collection_id)));
            }
            serve_file(
                paths.collection_video(&collection_id),
                format!("{}.mp4", collection_id),
            )
            .await
        }
        (None, None) => {
            let bytes = package_outputs(paths.output_dir()).await?;
            Ok(attachment_response(
                bytes,
                "application/zip",
                format!("{}.zip", id.as_str()),
            ))
        }
        (Some(_), Some(_)) => Err(ApiError::bad_request(
            "pass either clip_id or collection_id, not both",
        )),
    }
}

/// GET /api/projects/:project_id/clips/:clip_id/thumbnail
pub async fn clip_thumbnail(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let id = ProjectId::from_string(project_id);
    validate_id_segment(&clip_id)?;

    if let Some(bytes) = state.thumbnails.get(&id, &clip_id) {
        return Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response());
    }

    state.store.load_project(&id).await?;
    let path = state.store.paths(&id).clip_thumbnail(&clip_id);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("thumbnail for clip {}", clip_id)))?;

    state.thumbnails.insert(&id, &clip_id, bytes.clone());
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

/// Path segments coming from user input must not traverse directories.
fn validate_id_segment(id: &str) -> ApiResult<()> {
    if id.is_empty() || id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(ApiError::bad_request("invalid identifier"));
    }
    Ok(())
}

async fn serve_file(path: std::path::PathBuf, filename: String) -> ApiResult<Response> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("media file {}", filename)))?;
    Ok(attachment_response(bytes, "video/mp4", filename))
}

fn attachment_response(bytes: Vec<u8>, content_type: &'static str, filename: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
