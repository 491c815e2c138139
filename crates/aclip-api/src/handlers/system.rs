//! System status.

use aclip_scheduler::SchedulerStats;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SystemStatusResponse {
    pub scheduler: SchedulerStats,
    pub projects_total: usize,
}

/// GET /api/system/status
pub async fn system_status(State(state): State<AppState>) -> Json<SystemStatusResponse> {
    Json(SystemStatusResponse {
        scheduler: state.scheduler.stats(),
        projects_total: state.store.list_projects().await.len(),
    })
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
