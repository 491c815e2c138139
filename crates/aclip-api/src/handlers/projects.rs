//! Project listing, detail, status, logs and deletion.

use aclip_models::{
    ClipsMetadata, CollectionsMetadata, Project, ProjectId, ProjectSummary, TOTAL_STAGES,
};
use aclip_scheduler::TaskState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::services;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectSummary>,
}

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> Json<ProjectListResponse> {
    Json(ProjectListResponse {
        projects: state.store.list_projects().await,
    })
}

#[derive(Serialize)]
pub struct ProjectDetailResponse {
    #[serde(flatten)]
    pub project: Project,
    pub clips: ClipsMetadata,
    pub collections: CollectionsMetadata,
}

/// GET /api/projects/:project_id
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetailResponse>> {
    let id = ProjectId::from_string(project_id);
    let project = state.store.load_project(&id).await?;
    let clips = state.store.read_clips_metadata(&id).await?;
    let collections = state.store.read_collections_metadata(&id).await?;

    Ok(Json(ProjectDetailResponse {
        project,
        clips,
        collections,
    }))
}

/// DELETE /api/projects/:project_id
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = ProjectId::from_string(project_id);
    services::delete_project_cascade(&state, &id).await?;
    Ok(Json(serde_json::json!({"deleted": id.as_str()})))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub current_step: u8,
    pub total_steps: u8,
    pub step_name: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// GET /api/projects/:project_id/status
///
/// Prefers the scheduler's live status board; falls back to the persisted
/// project metadata when no task is tracked (e.g. after a restart).
pub async fn get_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = ProjectId::from_string(project_id);
    let project = state.store.load_project(&id).await?;

    let response = match state.scheduler.board().get(&id) {
        Some(task) => StatusResponse {
            status: match task.state {
                TaskState::Running => "processing".to_string(),
                TaskState::Completed => "completed".to_string(),
                TaskState::Failed => "error".to_string(),
                TaskState::Cancelled => "cancelled".to_string(),
            },
            current_step: task.stage_index,
            total_steps: task.total_stages,
            step_name: task.step_name,
            progress: task.progress,
            error_message: task.error_message,
        },
        None => StatusResponse {
            status: project.status.as_str().to_string(),
            current_step: project.current_stage,
            total_steps: TOTAL_STAGES,
            step_name: String::new(),
            progress: match project.status {
                aclip_models::ProjectStatus::Completed => 100,
                _ => ((project.current_stage as u32 - 1) * 100 / TOTAL_STAGES as u32) as u8,
            },
            error_message: project.error_message,
        },
    };

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_lines")]
    pub lines: usize,
}

fn default_lines() -> usize {
    100
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub lines: Vec<String>,
}

/// GET /api/projects/:project_id/logs?lines=N
pub async fn get_logs(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<LogsResponse>> {
    let id = ProjectId::from_string(project_id);
    state.store.load_project(&id).await?;

    let lines = state.store.log(&id).tail(query.lines.min(10_000)).await;
    Ok(Json(LogsResponse { lines }))
}
