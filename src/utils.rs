//! Utility functions for file operations and path manipulation

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

/// Strip every directory component from a path-like string
///
/// Both `/` and `\` count as separators, since the fetcher may print paths in
/// either form. Returns `None` when nothing usable remains (empty, `.` or `..`).
///
/// # Examples
///
/// ```
/// use vidpull::utils::basename;
///
/// assert_eq!(basename("/srv/videos/clip.mp4").as_deref(), Some("clip.mp4"));
/// assert_eq!(basename("C:\\videos\\clip.mp4").as_deref(), Some("clip.mp4"));
/// assert_eq!(basename("videos/.."), None);
/// ```
pub fn basename(path: &str) -> Option<String> {
    let trimmed = path.trim();
    let name = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .trim();

    if is_safe_basename(name) {
        Some(name.to_string())
    } else {
        None
    }
}

/// Whether `name` can be joined onto a directory without escaping it
pub fn is_safe_basename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Playback URL for a file in the videos directory
///
/// Returns `None` for names that are not safe basenames.
pub fn playback_url(name: &str) -> Option<String> {
    is_safe_basename(name).then(|| format!("/videos/{}", urlencoding::encode(name)))
}

/// Create `dir` and its parents if missing
///
/// Succeeds when the directory already exists.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// A downloaded file available for playback
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VideoEntry {
    /// Basename of the file
    pub name: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last modification time, if the platform reports one
    pub modified_at: Option<DateTime<Utc>>,
    /// URL the file is served under
    pub url: String,
}

/// List the regular files in the videos directory, sorted by name
///
/// Hidden files and entries whose names are not valid UTF-8 are skipped.
pub async fn list_videos(dir: &Path) -> Result<Vec<VideoEntry>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut videos = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let Some(url) = playback_url(&name) else {
            continue;
        };

        videos.push(VideoEntry {
            size_bytes: metadata.len(),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            url,
            name,
        });
    }

    videos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(videos)
}
