//! System handlers: ping, health, OpenAPI.

use axum::{Json, response::IntoResponse};
use serde_json::json;

/// GET /ping - Liveness check reporting the server process id
#[utoipa::path(
    get,
    path = "/ping",
    tag = "system",
    responses(
        (status = 200, description = "Backend is alive", body = super::PingResponse)
    )
)]
pub async fn ping() -> Json<super::PingResponse> {
    Json(super::PingResponse {
        ok: true,
        pid: std::process::id(),
    })
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
