//! HTTP API server module
//!
//! Serves the download endpoints, the downloaded files themselves, and an
//! OpenAPI description of the API.

use crate::{Config, DownloadOrchestrator, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /download-stream` - Download with server-sent progress events
/// - `POST /download` - Download and respond with the filename when finished
///
/// ## Videos
/// - `GET /videos/{name}` - Downloaded files, by basename
/// - `GET /library` - List downloaded files
///
/// ## System
/// - `GET /ping` - Liveness check with process id
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// Any other path is served from the configured static directory, if there is one.
/// Every `OPTIONS` request is answered with `204 No Content`.
pub fn create_router(orchestrator: Arc<DownloadOrchestrator>, config: Arc<Config>) -> Router {
    let state = AppState::new(orchestrator, config.clone());

    let router = Router::new()
        // Downloads
        .route("/download-stream", post(routes::download_stream))
        .route("/download", post(routes::download))
        // Videos
        .route("/library", get(routes::list_library))
        // System
        .route("/ping", get(routes::ping))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        // ServeDir rejects `..` components, so only files inside the directory are reachable
        .nest_service("/videos", ServeDir::new(config.videos_dir()));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = match &config.server.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    // Add state to all routes
    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    let router = if config.server.cors_enabled {
        let cors = build_cors_layer(&config.server.cors_origins);
        router.layer(cors)
    } else {
        router
    };

    // Outermost, so CORS preflight answers are rewritten too
    router.layer(middleware::from_fn(options_no_content))
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
///
/// # Returns
///
/// A configured CorsLayer that allows the specified origins, all methods,
/// and all headers for cross-origin requests.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Answer every `OPTIONS` request with an empty `204`, keeping any CORS headers
async fn options_no_content(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = next.run(request).await;
    *response.status_mut() = StatusCode::NO_CONTENT;
    *response.body_mut() = Body::empty();
    response.headers_mut().remove(axum::http::header::CONTENT_LENGTH);
    response.headers_mut().remove(axum::http::header::CONTENT_TYPE);
    response
}

/// Start the API server on the configured bind address.
///
/// Runs until `shutdown` is cancelled. In-flight downloads watch the same
/// token (see [`DownloadOrchestrator::with_shutdown`]), so their streams end
/// with an error event and the server can drain.
///
/// # Example
///
/// ```no_run
/// use vidpull::{Config, DownloadOrchestrator};
/// use vidpull::fetcher::CliFetcher;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let shutdown = CancellationToken::new();
/// let fetcher = Arc::new(CliFetcher::from_config(&config));
/// let orchestrator = Arc::new(
///     DownloadOrchestrator::new(fetcher, &config).with_shutdown(shutdown.clone()),
/// );
///
/// // Start API server (blocks until shutdown)
/// vidpull::api::start_api_server(orchestrator, config, shutdown).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    orchestrator: Arc<DownloadOrchestrator>,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.server.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(orchestrator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
