//! Project and collection operations behind the HTTP handlers.
//!
//! Handlers stay thin; the logic that mutates store state lives here so it
//! can be exercised without constructing HTTP requests.

use std::collections::HashSet;

use aclip_models::{
    ClipRecord, Collection, CollectionKind, CollectionRecord, Project, ProjectId, VideoCategory,
};
use aclip_scheduler::TaskKind;
use aclip_store::write_bytes_atomic;
use aclip_subtitle::parse_srt;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create a project from uploaded bytes and submit it to the scheduler.
///
/// Input errors (missing subtitles, unreadable media, unknown category) are
/// rejected before anything reaches the pipeline. A scheduler rejection
/// removes the just-created project so the submission leaves no trace.
pub async fn create_project_from_upload(
    state: &AppState,
    project_name: &str,
    category: Option<&str>,
    video_bytes: Vec<u8>,
    srt_bytes: Option<Vec<u8>>,
) -> ApiResult<Project> {
    let category = parse_category(category)?;

    if video_bytes.is_empty() {
        return Err(ApiError::bad_request("video file is empty or unreadable"));
    }

    let Some(srt_bytes) = srt_bytes else {
        return Err(ApiError::bad_request(
            "subtitles are required: upload an .srt file alongside the video",
        ));
    };
    let srt_text = String::from_utf8(srt_bytes)
        .map_err(|_| ApiError::bad_request("subtitle file is not valid UTF-8"))?;
    parse_srt(&srt_text)
        .map_err(|e| ApiError::bad_request(format!("invalid subtitle file: {}", e)))?;

    let name = if project_name.trim().is_empty() {
        "untitled project"
    } else {
        project_name.trim()
    };

    let project = state.store.create_project(name, category).await?;
    let paths = state.store.paths(&project.id);

    let written = async {
        write_bytes_atomic(paths.input_video(), &video_bytes).await?;
        write_bytes_atomic(paths.input_srt(), srt_text.as_bytes()).await
    }
    .await;

    if let Err(e) = written {
        let _ = state.store.delete_project(&project.id).await;
        return Err(e.into());
    }

    submit_or_rollback(state, project).await
}

/// Submit a fresh project to the scheduler, rolling the project back if
/// admission is rejected.
pub async fn submit_or_rollback(state: &AppState, project: Project) -> ApiResult<Project> {
    match state.scheduler.submit(project.id.clone(), TaskKind::Start) {
        Ok(()) => Ok(project),
        Err(e) => {
            warn!(project_id = %project.id, "admission rejected, rolling back project: {}", e);
            let _ = state.store.delete_project(&project.id).await;
            Err(e.into())
        }
    }
}

fn parse_category(category: Option<&str>) -> ApiResult<VideoCategory> {
    match category {
        None | Some("") => Ok(VideoCategory::Default),
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::bad_request(format!("unknown video category '{}'", s))),
    }
}

/// Delete a project and everything derived from it: running task, cached
/// thumbnails, scheduler status, working directory, index entry. Each step
/// is best-effort.
pub async fn delete_project_cascade(state: &AppState, project_id: &ProjectId) -> ApiResult<()> {
    if !state.store.exists(project_id).await {
        return Err(ApiError::not_found(format!("project {}", project_id)));
    }

    // Stop in-flight work first so nothing recreates files mid-delete.
    state.scheduler.evict(project_id);
    state.thumbnails.evict_project(project_id);
    state.gateway.forget_project(project_id.as_str());
    state.store.delete_project(project_id).await?;
    info!(project_id = %project_id, "project delete cascade finished");
    Ok(())
}

/// Edit a clip's title or recommendation reason in `clips_metadata.json`.
pub async fn update_clip(
    state: &AppState,
    project_id: &ProjectId,
    clip_id: &str,
    title: Option<String>,
    reason: Option<String>,
) -> ApiResult<ClipRecord> {
    let _guard = state.store.lock_project(project_id).await;
    ensure_project(state, project_id).await?;

    let mut meta = state.store.read_clips_metadata(project_id).await?;
    let record = meta
        .get_mut(clip_id)
        .ok_or_else(|| ApiError::not_found(format!("clip {}", clip_id)))?;

    if let Some(title) = title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title cannot be empty"));
        }
        record.clip.generated_title = title.trim().to_string();
    }
    if let Some(reason) = reason {
        record.clip.clip.recommend_reason = reason.trim().to_string();
    }

    let updated = record.clone();
    state.store.write_clips_metadata(project_id, &meta).await?;
    Ok(updated)
}

/// Delete a clip: its metadata entry, media files and any references from
/// collections. Collections shrink rather than blocking the delete; the
/// change is logged.
pub async fn delete_clip(
    state: &AppState,
    project_id: &ProjectId,
    clip_id: &str,
) -> ApiResult<()> {
    let _guard = state.store.lock_project(project_id).await;
    ensure_project(state, project_id).await?;

    let mut clips = state.store.read_clips_metadata(project_id).await?;
    if !clips.remove(clip_id) {
        return Err(ApiError::not_found(format!("clip {}", clip_id)));
    }
    state.store.write_clips_metadata(project_id, &clips).await?;

    let mut collections = state.store.read_collections_metadata(project_id).await?;
    let log = state.store.log(project_id);
    for record in &mut collections.collections {
        if record.collection.remove_clip(clip_id) {
            log.append(format!(
                "clip {} removed from collection {} by clip deletion",
                clip_id, record.collection.id
            ));
        }
    }
    state
        .store
        .write_collections_metadata(project_id, &collections)
        .await?;

    let paths = state.store.paths(project_id);
    for file in [paths.clip_video(clip_id), paths.clip_thumbnail(clip_id)] {
        if let Err(e) = tokio::fs::remove_file(&file).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %file.display(), "failed to remove clip file: {}", e);
            }
        }
    }
    state.thumbnails.evict_clip(project_id, clip_id);

    info!(project_id = %project_id, clip_id, "clip deleted");
    Ok(())
}

/// Create a manual collection.
pub async fn create_collection(
    state: &AppState,
    project_id: &ProjectId,
    title: String,
    summary: String,
    clip_ids: Vec<String>,
) -> ApiResult<CollectionRecord> {
    let _guard = state.store.lock_project(project_id).await;
    ensure_project(state, project_id).await?;

    if title.trim().is_empty() {
        return Err(ApiError::bad_request("collection title cannot be empty"));
    }

    let clips = state.store.read_clips_metadata(project_id).await?;
    let clip_ids = validate_clip_ids(
        &clip_ids,
        &clips,
        state.pipeline.config().max_clips_per_collection,
    )?;

    let record = CollectionRecord {
        collection: Collection::new(title.trim(), summary.trim(), clip_ids, CollectionKind::Manual),
        artifact: None,
    };

    let mut collections = state.store.read_collections_metadata(project_id).await?;
    collections.collections.push(record.clone());
    state
        .store
        .write_collections_metadata(project_id, &collections)
        .await?;

    info!(project_id = %project_id, collection_id = %record.collection.id, "collection created");
    Ok(record)
}

/// Edit a collection's title, summary or clip ordering. A `clip_ids` change
/// drops the stale artifact reference; regeneration rebuilds it.
pub async fn update_collection(
    state: &AppState,
    project_id: &ProjectId,
    collection_id: &str,
    title: Option<String>,
    summary: Option<String>,
    clip_ids: Option<Vec<String>>,
) -> ApiResult<CollectionRecord> {
    let _guard = state.store.lock_project(project_id).await;
    ensure_project(state, project_id).await?;

    let clips = state.store.read_clips_metadata(project_id).await?;
    let mut collections = state.store.read_collections_metadata(project_id).await?;
    let record = collections
        .get_mut(collection_id)
        .ok_or_else(|| ApiError::not_found(format!("collection {}", collection_id)))?;

    if let Some(title) = title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("collection title cannot be empty"));
        }
        record.collection.title = title.trim().to_string();
    }
    if let Some(summary) = summary {
        record.collection.summary = summary.trim().to_string();
    }
    if let Some(ids) = clip_ids {
        // Reorders are unrestricted by the creation-time cap, but ids must
        // resolve and stay unique.
        let ids = validate_clip_ids(&ids, &clips, usize::MAX)?;
        record.collection.clip_ids = ids;
        record.artifact = None;
    }

    let updated = record.clone();
    state
        .store
        .write_collections_metadata(project_id, &collections)
        .await?;
    Ok(updated)
}

/// Delete a collection and its artifact file.
pub async fn delete_collection(
    state: &AppState,
    project_id: &ProjectId,
    collection_id: &str,
) -> ApiResult<()> {
    let _guard = state.store.lock_project(project_id).await;
    ensure_project(state, project_id).await?;

    let mut collections = state.store.read_collections_metadata(project_id).await?;
    if !collections.remove(collection_id) {
        return Err(ApiError::not_found(format!("collection {}", collection_id)));
    }
    state
        .store
        .write_collections_metadata(project_id, &collections)
        .await?;

    let video = state.store.paths(project_id).collection_video(collection_id);
    if let Err(e) = tokio::fs::remove_file(&video).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %video.display(), "failed to remove collection file: {}", e);
        }
    }

    info!(project_id = %project_id, collection_id, "collection deleted");
    Ok(())
}

async fn ensure_project(state: &AppState, project_id: &ProjectId) -> ApiResult<()> {
    if state.store.exists(project_id).await {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("project {}", project_id)))
    }
}

/// Enforce the collection invariants on a clip id list: no duplicates,
/// every id resolves, size within the cap.
fn validate_clip_ids(
    ids: &[String],
    clips: &aclip_models::ClipsMetadata,
    max_clips: usize,
) -> ApiResult<Vec<String>> {
    if ids.is_empty() {
        return Err(ApiError::bad_request("collection needs at least one clip"));
    }
    if ids.len() > max_clips {
        return Err(ApiError::bad_request(format!(
            "collection holds {} clips, the cap is {}",
            ids.len(),
            max_clips
        )));
    }

    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(ApiError::bad_request(format!("duplicate clip id {}", id)));
        }
        if clips.get(id).is_none() {
            return Err(ApiError::bad_request(format!("unknown clip id {}", id)));
        }
    }

    Ok(ids.to_vec())
}
