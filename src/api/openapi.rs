//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the vidpull HTTP API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the vidpull HTTP API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vidpull HTTP API",
        version = "0.1.0",
        description = "Downloads videos with yt-dlp, streams progress as server-sent events, and serves the results",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::download_stream,
        crate::api::routes::download,

        // Videos
        crate::api::routes::list_library,

        // System
        crate::api::routes::ping,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::DownloadRequest,
        crate::types::ProgressEvent,
        crate::types::DonePayload,
        crate::types::ErrorPayload,
        crate::types::DownloadOutcome,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::FetcherConfig,
        crate::config::ApiConfig,

        // Library listing
        crate::utils::VideoEntry,

        // API request/response types from routes
        crate::api::routes::DownloadResponse,
        crate::api::routes::PingResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Downloads - Fetch a video by link, with streamed or synchronous completion"),
        (name = "videos", description = "Videos - List downloaded files; the files themselves are served under /videos"),
        (name = "system", description = "System endpoints - Liveness, health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
