//! # vidpull
//!
//! Video download backend: takes a link, runs yt-dlp, and relays its progress
//! to the browser as server-sent events while the download runs.
//!
//! ## Design
//!
//! - **No shared request state** - each download owns its process, buffers and stream
//! - **Exactly one outcome** - every request ends in one `done` or `error`, never both
//! - **No shell** - links reach yt-dlp as a single argument after `--`
//! - **Nothing leaks** - a client that disconnects takes its yt-dlp process with it
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidpull::{Config, DownloadOrchestrator, DownloadRequest};
//! use vidpull::fetcher::CliFetcher;
//! use std::sync::Arc;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let fetcher = Arc::new(CliFetcher::from_config(&config));
//!     let orchestrator = Arc::new(DownloadOrchestrator::new(fetcher, &config));
//!
//!     let mut events = orchestrator.stream(DownloadRequest::new("dQw4w9WgXcQ"));
//!     while let Some(event) = events.next().await {
//!         println!("{}: {}", event.event_name(), event.payload_json()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-request event channel
pub mod events;
/// External fetcher (yt-dlp) integration
pub mod fetcher;
/// Download lifecycle
pub mod orchestrator;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use events::{Disconnected, EventChannel, event_channel};
pub use fetcher::{CliFetcher, Fetcher};
pub use orchestrator::{DownloadOrchestrator, Stage};
pub use types::{
    DonePayload, DownloadOutcome, DownloadRequest, ErrorPayload, ExitReport, ProgressEvent,
    StreamEvent,
};

/// Serve the API until a termination signal arrives.
///
/// Creates the videos directory, runs yt-dlp through [`CliFetcher`], and on
/// signal terminates every in-flight download before the server stops.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vidpull::{Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     run_with_shutdown(config).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(config: Config) -> Result<()> {
    config.validate()?;
    utils::ensure_dir(config.videos_dir()).await?;

    let fetcher = CliFetcher::from_config(&config);
    tracing::info!(
        binary = %fetcher.binary_path().display(),
        videos_dir = %config.videos_dir().display(),
        "Using yt-dlp"
    );

    let shutdown = CancellationToken::new();
    let orchestrator = Arc::new(
        DownloadOrchestrator::new(Arc::new(fetcher), &config).with_shutdown(shutdown.clone()),
    );

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            shutdown.cancel();
        }
    });

    api::start_api_server(orchestrator, Arc::new(config), shutdown).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
