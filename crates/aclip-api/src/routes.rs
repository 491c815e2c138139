//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::categories::list_categories;
use crate::handlers::clips::{delete_clip, update_clip};
use crate::handlers::collections::{
    create_collection, delete_collection, generate_collection, update_collection,
};
use crate::handlers::download::{clip_thumbnail, download};
use crate::handlers::process::{cancel_project, process_project, restart_step, retry_project};
use crate::handlers::projects::{
    delete_project, get_logs, get_project, get_status, list_projects,
};
use crate::handlers::system::{health, system_status};
use crate::handlers::upload::{download_project, upload_project};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let project_routes = Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id", delete(delete_project))
        .route("/projects/:project_id/status", get(get_status))
        .route("/projects/:project_id/logs", get(get_logs))
        .route("/projects/:project_id/process", post(process_project))
        .route("/projects/:project_id/retry", post(retry_project))
        .route("/projects/:project_id/restart-step", post(restart_step))
        .route("/projects/:project_id/cancel", post(cancel_project))
        .route("/projects/:project_id/download", get(download));

    let clip_routes = Router::new()
        .route("/projects/:project_id/clips/:clip_id", patch(update_clip))
        .route("/projects/:project_id/clips/:clip_id", delete(delete_clip))
        .route(
            "/projects/:project_id/clips/:clip_id/thumbnail",
            get(clip_thumbnail),
        );

    let collection_routes = Router::new()
        .route("/projects/:project_id/collections", post(create_collection))
        .route(
            "/projects/:project_id/collections/:collection_id",
            patch(update_collection),
        )
        .route(
            "/projects/:project_id/collections/:collection_id",
            delete(delete_collection),
        )
        .route(
            "/projects/:project_id/collections/:collection_id/generate",
            post(generate_collection),
        );

    let api_routes = Router::new()
        .route("/video-categories", get(list_categories))
        .route("/upload", post(upload_project))
        .route("/download", post(download_project))
        .route("/system/status", get(system_status))
        .merge(project_routes)
        .merge(clip_routes)
        .merge(collection_routes);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(parsed)
    }
}
