//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Streaming and synchronous downloads
//! - [`videos`] - Library listing (files themselves are served by `/videos`)
//! - [`system`] - Ping, health, OpenAPI

use serde::{Deserialize, Serialize};

mod downloads;
mod system;
mod videos;

// Re-export all handlers so `routes::function_name` continues to work
pub use downloads::*;
pub use system::*;
pub use videos::*;

/// Response for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Basename of the downloaded file, playable under `/videos/`
    pub filename: String,
}

/// Response for GET /ping
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PingResponse {
    /// Always true
    pub ok: bool,
    /// Process id of the server
    pub pid: u32,
}
