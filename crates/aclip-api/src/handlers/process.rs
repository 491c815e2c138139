//! Pipeline control: process, retry, restart-step, cancel.

use aclip_models::{ProjectId, TOTAL_STAGES};
use aclip_scheduler::TaskKind;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /api/projects/:project_id/process
pub async fn process_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    submit(&state, project_id, TaskKind::Start).await
}

/// POST /api/projects/:project_id/retry
pub async fn retry_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    submit(&state, project_id, TaskKind::Retry).await
}

#[derive(Debug, Deserialize)]
pub struct RestartStepRequest {
    pub step: u8,
}

/// POST /api/projects/:project_id/restart-step
pub async fn restart_step(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<RestartStepRequest>,
) -> ApiResult<StatusCode> {
    if request.step < 1 || request.step > TOTAL_STAGES {
        return Err(ApiError::bad_request(format!(
            "step must be between 1 and {}",
            TOTAL_STAGES
        )));
    }
    submit(
        &state,
        project_id,
        TaskKind::Resume {
            from_stage: request.step,
        },
    )
    .await
}

/// POST /api/projects/:project_id/cancel
pub async fn cancel_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = ProjectId::from_string(project_id);
    state.store.load_project(&id).await?;
    state.scheduler.cancel(&id)?;
    Ok(StatusCode::ACCEPTED)
}

async fn submit(state: &AppState, project_id: String, kind: TaskKind) -> ApiResult<StatusCode> {
    let id = ProjectId::from_string(project_id);
    let project = state.store.load_project(&id).await?;

    if !project.status.is_idle() {
        return Err(ApiError::conflict(format!(
            "project {} is {}",
            id,
            project.status.as_str()
        )));
    }

    state.scheduler.submit(id, kind)?;
    Ok(StatusCode::ACCEPTED)
}
