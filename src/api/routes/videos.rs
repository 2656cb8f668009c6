//! Library handler: files already downloaded.

use crate::api::AppState;
use crate::error::Result;
use crate::utils::{VideoEntry, ensure_dir, list_videos};
use axum::{Json, extract::State};

/// GET /library - List downloaded videos with their playback URLs
#[utoipa::path(
    get,
    path = "/library",
    tag = "videos",
    responses(
        (status = 200, description = "Files in the videos directory, sorted by name", body = Vec<VideoEntry>),
        (status = 500, description = "The videos directory could not be read", body = crate::error::ApiError)
    )
)]
pub async fn list_library(State(state): State<AppState>) -> Result<Json<Vec<VideoEntry>>> {
    let dir = state.config.videos_dir();
    ensure_dir(dir).await?;
    Ok(Json(list_videos(dir).await?))
}
