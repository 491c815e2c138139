//! Project creation: multipart upload and remote download.

use aclip_media::{download_source, MediaError};
use aclip_models::{Project, ProjectStatus, VideoCategory};
use aclip_scheduler::TaskKind;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services;
use crate::state::AppState;

/// POST /api/upload
///
/// Multipart fields: `video_file`, optional `srt_file`, `project_name`,
/// `video_category`. Creates the project and starts the pipeline; rejects
/// with 429 when the scheduler is at capacity, leaving no partial project.
pub async fn upload_project(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let mut video_bytes: Option<Vec<u8>> = None;
    let mut srt_bytes: Option<Vec<u8>> = None;
    let mut project_name = String::new();
    let mut category: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "video_file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read video: {}", e)))?;
                video_bytes = Some(bytes.to_vec());
            }
            "srt_file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read subtitles: {}", e)))?;
                srt_bytes = Some(bytes.to_vec());
            }
            "project_name" => {
                project_name = field.text().await.unwrap_or_default();
            }
            "video_category" => {
                category = Some(field.text().await.unwrap_or_default());
            }
            other => {
                warn!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let video_bytes =
        video_bytes.ok_or_else(|| ApiError::bad_request("video_file field is required"))?;

    let project = services::create_project_from_upload(
        &state,
        &project_name,
        category.as_deref(),
        video_bytes,
        srt_bytes,
    )
    .await?;

    info!(project_id = %project.id, "upload accepted");
    Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub video_category: Option<String>,
}

/// POST /api/download
///
/// Creates a project and fetches the source video plus subtitles from a
/// remote URL in the background. The pipeline starts once the download
/// lands; a source without subtitles fails the project early.
pub async fn download_project(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let category: VideoCategory = match request.video_category.as_deref() {
        None | Some("") => VideoCategory::Default,
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::bad_request(format!("unknown video category '{}'", s)))?,
    };

    let name = request
        .project_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| request.url.clone());

    let project = state.store.create_project(name, category).await?;
    let project_id = project.id.clone();
    let url = request.url.clone();
    let task_state = state.clone();

    tokio::spawn(async move {
        let input_dir = task_state.store.paths(&project_id).input_dir();
        match download_source(&url, &input_dir).await {
            Ok(_) => {
                let project = match task_state.store.load_project(&project_id).await {
                    Ok(p) => p,
                    Err(e) => {
                        error!(project_id = %project_id, "project vanished mid-download: {}", e);
                        return;
                    }
                };
                if let Err(e) = task_state
                    .scheduler
                    .submit(project.id.clone(), TaskKind::Start)
                {
                    record_download_failure(&task_state, &project_id, e.to_string()).await;
                }
            }
            Err(MediaError::SubtitlesUnavailable) => {
                record_download_failure(
                    &task_state,
                    &project_id,
                    "source provides no subtitles".to_string(),
                )
                .await;
            }
            Err(e) => {
                record_download_failure(&task_state, &project_id, e.to_string()).await;
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(project)))
}

async fn record_download_failure(state: &AppState, project_id: &aclip_models::ProjectId, message: String) {
    error!(project_id = %project_id, "download failed: {}", message);
    let _guard = state.store.lock_project(project_id).await;
    if let Ok(mut project) = state.store.load_project(project_id).await {
        project.status = ProjectStatus::Error;
        project.error_message = Some(message);
        project.updated_at = chrono::Utc::now();
        let _ = state.store.save_project(&project).await;
    }
}
