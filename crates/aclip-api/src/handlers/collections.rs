//! Collection CRUD and regeneration.

use aclip_models::{CollectionRecord, ProjectId};
use aclip_scheduler::TaskKind;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub clip_ids: Vec<String>,
}

/// POST /api/projects/:project_id/collections
pub async fn create_collection(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<CreateCollectionRequest>,
) -> ApiResult<(StatusCode, Json<CollectionRecord>)> {
    let id = ProjectId::from_string(project_id);
    let record = services::create_collection(
        &state,
        &id,
        request.title,
        request.summary,
        request.clip_ids,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCollectionRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Full replacement order; a reorder passes the same ids rearranged
    #[serde(default)]
    pub clip_ids: Option<Vec<String>>,
}

/// PATCH /api/projects/:project_id/collections/:collection_id
pub async fn update_collection(
    State(state): State<AppState>,
    Path((project_id, collection_id)): Path<(String, String)>,
    Json(request): Json<UpdateCollectionRequest>,
) -> ApiResult<Json<CollectionRecord>> {
    let id = ProjectId::from_string(project_id);
    let record = services::update_collection(
        &state,
        &id,
        &collection_id,
        request.title,
        request.summary,
        request.clip_ids,
    )
    .await?;
    Ok(Json(record))
}

/// DELETE /api/projects/:project_id/collections/:collection_id
pub async fn delete_collection(
    State(state): State<AppState>,
    Path((project_id, collection_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = ProjectId::from_string(project_id);
    services::delete_collection(&state, &id, &collection_id).await?;
    Ok(Json(serde_json::json!({"deleted": collection_id})))
}

/// POST /api/projects/:project_id/collections/:collection_id/generate
///
/// Triggers stage-6 regeneration for one collection.
pub async fn generate_collection(
    State(state): State<AppState>,
    Path((project_id, collection_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let id = ProjectId::from_string(project_id);
    state.store.load_project(&id).await?;

    let collections = state.store.read_collections_metadata(&id).await?;
    if collections.get(&collection_id).is_none() {
        return Err(ApiError::not_found(format!("collection {}", collection_id)));
    }

    state
        .scheduler
        .submit(id, TaskKind::RegenerateCollection { collection_id })?;
    Ok(StatusCode::ACCEPTED)
}
