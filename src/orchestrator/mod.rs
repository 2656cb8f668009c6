//! Download orchestration - the lifecycle of a single download request.
//!
//! One [`DownloadOrchestrator`] serves every request; per-request state (the
//! fetch process, demuxer buffers, resolved filename) lives on the stack of
//! the task handling that request and is never shared.
//!
//! Two response styles share the same lifecycle:
//! - [`DownloadOrchestrator::stream`] - progress events, then one terminal event
//! - [`DownloadOrchestrator::download`] - wait for completion, return the filename

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{EventChannel, event_channel};
use crate::fetcher::{Channel, Fetcher, LineDemuxer, ProcessControl, parse_progress_line};
use crate::types::{DownloadOutcome, DownloadRequest, ExitReport, StreamEvent};
use crate::utils::ensure_dir;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Size of each read from a fetcher output pipe
const READ_CHUNK: usize = 8 * 1024;

/// Lifecycle stage of a download request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Checking the request
    Validating,
    /// Best-effort dry-run lookup of the output filename
    ResolvingFilename,
    /// The fetcher is running and its output is being relayed
    Downloading,
    /// Second lookup after a successful download whose name was still unknown
    ResolvingFilenameFallback,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

/// Runs download requests against a [`Fetcher`]
pub struct DownloadOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    videos_dir: PathBuf,
    event_buffer: usize,
    kill_grace_period: Duration,
    shutdown: CancellationToken,
}

impl DownloadOrchestrator {
    /// Create an orchestrator writing into the configured videos directory
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        Self {
            fetcher,
            videos_dir: config.videos_dir().clone(),
            event_buffer: config.server.event_buffer,
            kill_grace_period: config.fetcher.kill_grace_period,
            shutdown: CancellationToken::new(),
        }
    }

    /// Terminate in-flight downloads when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that, when cancelled, terminates every in-flight download
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Directory downloads are written to
    pub fn videos_dir(&self) -> &PathBuf {
        &self.videos_dir
    }

    /// Start a download in the background and return its event stream
    ///
    /// The stream yields zero or more progress events followed by exactly one
    /// `done` or `error` event, then ends. Dropping the stream terminates the
    /// fetcher.
    pub fn stream(self: &Arc<Self>, request: DownloadRequest) -> ReceiverStream<StreamEvent> {
        let (channel, events) = event_channel(self.event_buffer);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run(request, channel).await;
        });
        events
    }

    /// Run a download to completion, returning the produced filename
    ///
    /// Progress is consumed internally. A download that succeeds but whose
    /// filename cannot be determined is reported as
    /// [`Error::ResolutionFailed`], since callers of this variant need a name.
    pub async fn download(&self, request: DownloadRequest) -> Result<String> {
        let (channel, mut events) = event_channel(self.event_buffer);

        let drain = async move {
            while let Some(event) = events.next().await {
                if let StreamEvent::Progress(progress) = event {
                    tracing::trace!(line = %progress.raw, "yt-dlp");
                }
            }
        };
        let (outcome, ()) = tokio::join!(self.run(request, channel), drain);

        if !outcome.success {
            return Err(outcome_error(outcome));
        }
        outcome.filename.ok_or_else(|| {
            Error::ResolutionFailed(
                "download finished but the output filename could not be determined".to_string(),
            )
        })
    }

    /// Run one request, sending progress and the terminal outcome on `channel`
    ///
    /// Never fails: every error becomes a failed [`DownloadOutcome`], which is
    /// also returned.
    pub async fn run(&self, request: DownloadRequest, channel: EventChannel) -> DownloadOutcome {
        let span = tracing::info_span!("download", link = %request.link);

        async move {
            let mut stage = Stage::Validating;
            let outcome = match self.execute(&request, &channel, &mut stage).await {
                Ok(filename) => {
                    advance(&mut stage, Stage::Completed);
                    tracing::info!(filename = ?filename, "Download complete");
                    DownloadOutcome::completed(filename)
                }
                Err(e) => {
                    let failed_at = stage;
                    advance(&mut stage, Stage::Failed);
                    if e.is_client_error() {
                        tracing::warn!(error = %e, "Rejected download request");
                    } else {
                        tracing::error!(stage = ?failed_at, error = %e, "Download failed");
                    }
                    DownloadOutcome::failed(&e)
                }
            };

            if !channel.finish(outcome.clone()).await {
                tracing::debug!("Event stream closed before the terminal event");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    /// Phases:
    /// 1. Validate the link
    /// 2. Ensure the videos directory exists
    /// 3. Resolve the output filename (best effort)
    /// 4. Run the fetcher, relaying its output
    /// 5. Resolve the filename again if still unknown
    async fn execute(
        &self,
        request: &DownloadRequest,
        channel: &EventChannel,
        stage: &mut Stage,
    ) -> Result<Option<String>> {
        // Phase 1
        let link = validate_link(&request.link)?;

        // Phase 2
        ensure_dir(&self.videos_dir).await?;

        // Phase 3
        advance(stage, Stage::ResolvingFilename);
        let mut filename = self.try_resolve(link, channel).await?;

        // Phase 4
        advance(stage, Stage::Downloading);
        let process = self.fetcher.spawn(link)?;
        tracing::info!(pid = ?process.id(), fetcher = self.fetcher.name(), "Download started");

        let exit = self.relay(process.into_parts(), channel).await?;
        if !exit.is_success() {
            return Err(Error::exit_failed(exit.code, exit.signal));
        }

        // Phase 5
        if filename.is_none() {
            advance(stage, Stage::ResolvingFilenameFallback);
            filename = self.try_resolve(link, channel).await?;
        }
        Ok(filename)
    }

    /// Dry-run filename lookup; a failed lookup is `None`, not an error
    ///
    /// Dropping the lookup on disconnect or shutdown kills the dry-run process.
    async fn try_resolve(&self, link: &str, channel: &EventChannel) -> Result<Option<String>> {
        let resolved = tokio::select! {
            biased;
            _ = channel.disconnected() => {
                tracing::warn!("Client left during filename lookup");
                return Err(Error::Cancelled("client disconnected".to_string()));
            }
            _ = self.shutdown.cancelled() => {
                tracing::warn!("Shutdown during filename lookup");
                return Err(Error::Cancelled("server shutting down".to_string()));
            }
            resolved = self.fetcher.resolve_filename(link) => resolved,
        };

        match resolved {
            Ok(name) => {
                tracing::debug!(filename = %name, "Resolved output filename");
                Ok(Some(name))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not determine filename");
                Ok(None)
            }
        }
    }

    /// Forward fetcher output line by line until both pipes close, then wait for exit
    ///
    /// Terminates the fetcher if the event receiver goes away or shutdown is requested.
    async fn relay(
        &self,
        (mut primary, mut secondary, mut control): (
            crate::fetcher::OutputStream,
            crate::fetcher::OutputStream,
            Box<dyn ProcessControl>,
        ),
        channel: &EventChannel,
    ) -> Result<ExitReport> {
        let mut demuxer = LineDemuxer::new();
        let mut primary_buf = vec![0u8; READ_CHUNK];
        let mut secondary_buf = vec![0u8; READ_CHUNK];
        let mut primary_open = true;
        let mut secondary_open = true;

        while primary_open || secondary_open {
            let (source, read) = tokio::select! {
                read = primary.read(&mut primary_buf), if primary_open => (Channel::Primary, read),
                read = secondary.read(&mut secondary_buf), if secondary_open => (Channel::Secondary, read),
                _ = channel.disconnected() => {
                    return Err(self.abort(control.as_mut(), "client disconnected").await);
                }
                _ = self.shutdown.cancelled() => {
                    return Err(self.abort(control.as_mut(), "server shutting down").await);
                }
            };

            let lines: Vec<String> = match read {
                Ok(0) | Err(_) => {
                    if let Err(e) = &read {
                        tracing::warn!(channel = ?source, error = %e, "Failed to read yt-dlp output");
                    }
                    match source {
                        Channel::Primary => primary_open = false,
                        Channel::Secondary => secondary_open = false,
                    }
                    demuxer.finish(source).into_iter().collect()
                }
                Ok(n) => {
                    let chunk = match source {
                        Channel::Primary => &primary_buf[..n],
                        Channel::Secondary => &secondary_buf[..n],
                    };
                    demuxer.feed(source, chunk).collect()
                }
            };

            for line in lines {
                if let Err(reason) = self.deliver(channel, source, line).await {
                    return Err(self.abort(control.as_mut(), reason).await);
                }
            }
        }

        tokio::select! {
            exit = control.wait() => exit.map_err(|e| Error::ExitFailed {
                code: None,
                signal: None,
                message: format!("failed to wait for yt-dlp: {e}"),
            }),
            _ = channel.disconnected() => {
                Err(self.abort(control.as_mut(), "client disconnected").await)
            }
            _ = self.shutdown.cancelled() => {
                Err(self.abort(control.as_mut(), "server shutting down").await)
            }
        }
    }

    /// Parse and push one line; blank lines are dropped
    async fn deliver(
        &self,
        channel: &EventChannel,
        source: Channel,
        line: String,
    ) -> std::result::Result<(), &'static str> {
        if line.trim().is_empty() {
            return Ok(());
        }
        tracing::trace!(channel = ?source, line = %line, "yt-dlp");

        let event = parse_progress_line(&line);
        tokio::select! {
            sent = channel.send_progress(event) => sent.map_err(|_| "client disconnected"),
            _ = self.shutdown.cancelled() => Err("server shutting down"),
        }
    }

    async fn abort(&self, control: &mut dyn ProcessControl, reason: &str) -> Error {
        tracing::warn!(pid = ?control.id(), reason, "Terminating yt-dlp");
        match control.terminate(self.kill_grace_period).await {
            Ok(exit) => tracing::debug!(code = ?exit.code, signal = ?exit.signal, "yt-dlp terminated"),
            Err(e) => tracing::error!(error = %e, "Failed to terminate yt-dlp"),
        }
        Error::Cancelled(reason.to_string())
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = ?*stage, to = ?next, "Stage transition");
    *stage = next;
}

/// Trimmed link, or a client error if it is unusable
fn validate_link(link: &str) -> Result<&str> {
    let link = link.trim();
    if link.is_empty() {
        return Err(Error::InvalidRequest("missing link".to_string()));
    }
    if link.contains(['\0', '\r', '\n']) {
        return Err(Error::InvalidRequest(
            "link must not contain control characters".to_string(),
        ));
    }
    Ok(link)
}

/// Rebuild an error from a failed outcome for the synchronous response
fn outcome_error(outcome: DownloadOutcome) -> Error {
    let message = outcome
        .error_message
        .unwrap_or_else(|| "download failed".to_string());

    match outcome.error_code.as_deref() {
        Some("invalid_request") => Error::InvalidRequest(strip_prefix(&message, "invalid request: ")),
        Some("launch_failed") => {
            Error::LaunchFailed(strip_prefix(&message, "failed to launch fetcher: "))
        }
        Some("cancelled") => Error::Cancelled(strip_prefix(&message, "download cancelled: ")),
        Some("exit_failed") => Error::ExitFailed {
            code: outcome.exit_code,
            signal: outcome.signal,
            message,
        },
        _ => Error::Other(message),
    }
}

fn strip_prefix(message: &str, prefix: &str) -> String {
    message.strip_prefix(prefix).unwrap_or(message).to_string()
}
