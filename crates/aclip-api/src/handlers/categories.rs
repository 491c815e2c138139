//! Video category listing.

use aclip_models::VideoCategory;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct CategoryEntry {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryEntry>,
    pub default_category: &'static str,
}

/// GET /api/video-categories
pub async fn list_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: VideoCategory::ALL
            .iter()
            .map(|c| CategoryEntry {
                value: c.as_str(),
                label: c.label(),
            })
            .collect(),
        default_category: VideoCategory::Default.as_str(),
    })
}
