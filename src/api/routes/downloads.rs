//! Download handlers: streaming and synchronous.

use super::DownloadResponse;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{DownloadOutcome, DownloadRequest, StreamEvent};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::stream::BoxStream;
use std::convert::Infallible;
use tokio_stream::{Stream, StreamExt};

/// POST /download-stream - Download a video, streaming progress as server-sent events
///
/// Event types: `progress` (one per fetcher output line), then exactly one
/// `done` (`{"success": true, "filename": ...}`) or `error` (`{"message", "code"?, "signal"?}`).
/// The connection closes after the terminal event. Closing it early
/// terminates the download.
#[utoipa::path(
    post,
    path = "/download-stream",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn download_stream(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let events: BoxStream<'static, StreamEvent> = match payload {
        Ok(Json(request)) => Box::pin(state.orchestrator.stream(request)),
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected download-stream body");
            let error = Error::InvalidRequest(rejection.body_text());
            Box::pin(tokio_stream::once(StreamEvent::from(
                DownloadOutcome::failed(&error),
            )))
        }
    };

    // Flush headers right away so proxies see a live stream before the first line
    let opened = tokio_stream::once(Ok::<_, Infallible>(
        SseEvent::default().comment("stream open"),
    ));

    let sse_stream = events.filter_map(|event| match event.payload_json() {
        Ok(json_data) => Some(Ok(SseEvent::default()
            .event(event.event_name())
            .data(json_data))),
        Err(e) => {
            tracing::warn!("Failed to serialize event to JSON: {}", e);
            None
        }
    });

    Sse::new(opened.chain(sse_stream))
        .keep_alive(KeepAlive::new().interval(state.config.server.keep_alive_interval))
}

/// POST /download - Download a video and respond once it has finished
#[utoipa::path(
    post,
    path = "/download",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Download finished", body = DownloadResponse),
        (status = 400, description = "Missing or malformed link", body = crate::error::ApiError),
        (status = 502, description = "yt-dlp failed or the filename could not be determined", body = crate::error::ApiError),
        (status = 503, description = "yt-dlp could not be started", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, Error> {
    let Json(request) = payload.map_err(|rejection| Error::InvalidRequest(rejection.body_text()))?;

    let filename = state.orchestrator.download(request).await?;
    Ok(Json(DownloadResponse { filename }))
}
