//! Clip editing.

use aclip_models::{ClipRecord, ProjectId};
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::services;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateClipRequest {
    #[serde(default)]
    pub generated_title: Option<String>,
    #[serde(default)]
    pub recommend_reason: Option<String>,
}

/// PATCH /api/projects/:project_id/clips/:clip_id
pub async fn update_clip(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
    Json(request): Json<UpdateClipRequest>,
) -> ApiResult<Json<ClipRecord>> {
    let id = ProjectId::from_string(project_id);
    let record = services::update_clip(
        &state,
        &id,
        &clip_id,
        request.generated_title,
        request.recommend_reason,
    )
    .await?;
    Ok(Json(record))
}

/// DELETE /api/projects/:project_id/clips/:clip_id
pub async fn delete_clip(
    State(state): State<AppState>,
    Path((project_id, clip_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = ProjectId::from_string(project_id);
    services::delete_clip(&state, &id, &clip_id).await?;
    Ok(Json(serde_json::json!({"deleted": clip_id})))
}
