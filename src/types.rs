//! Core types and events for vidpull

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Error;

/// A request to fetch one video
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// A video URL or a bare video identifier, passed to the fetcher verbatim
    #[serde(default)]
    pub link: String,
}

impl DownloadRequest {
    /// Create a request for the given link
    pub fn new(link: impl Into<String>) -> Self {
        Self { link: link.into() }
    }
}

/// One structured progress record, parsed from a single fetcher output line
///
/// Every field except `raw` is optional: lines that carry no recognizable
/// tokens still produce an event with only `raw` set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressEvent {
    /// The line exactly as demuxed from the fetcher output
    pub raw: String,

    /// Completion percentage in the range 0..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,

    /// Transfer speed as printed, e.g. "123.45KiB/s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Estimated time remaining as printed, e.g. "00:01"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,

    /// Total size as printed, e.g. "10.34MiB"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,

    /// Free text following a `[download]` tag, trimmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProgressEvent {
    /// Whether only the raw line is populated
    pub fn is_unstructured(&self) -> bool {
        self.percent.is_none()
            && self.speed.is_none()
            && self.eta.is_none()
            && self.total.is_none()
            && self.status.is_none()
    }
}

/// How a fetcher process ended
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, if the process exited on its own
    pub code: Option<i32>,
    /// Name of the terminating signal, if any (e.g. "SIGTERM")
    pub signal: Option<String>,
}

impl ExitReport {
    /// A clean exit with status zero
    pub fn success() -> Self {
        Self {
            code: Some(0),
            signal: None,
        }
    }

    /// An exit with the given status code
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Whether the process exited with status zero
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitReport {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal().map(signal_name)
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Conventional name for a POSIX signal number
pub fn signal_name(signal: i32) -> String {
    match signal {
        1 => "SIGHUP".to_string(),
        2 => "SIGINT".to_string(),
        3 => "SIGQUIT".to_string(),
        6 => "SIGABRT".to_string(),
        9 => "SIGKILL".to_string(),
        11 => "SIGSEGV".to_string(),
        13 => "SIGPIPE".to_string(),
        15 => "SIGTERM".to_string(),
        other => format!("SIG{other}"),
    }
}

/// Terminal record of a download request
///
/// Exactly one is produced per request. `filename` is always a basename.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadOutcome {
    /// Whether the fetcher completed successfully
    pub success: bool,
    /// Basename of the produced file, when it could be determined
    pub filename: Option<String>,
    /// Failure description
    pub error_message: Option<String>,
    /// Machine-readable failure code (see [`crate::ToHttpStatus::error_code`])
    pub error_code: Option<String>,
    /// Fetcher exit code on failure
    pub exit_code: Option<i32>,
    /// Fetcher terminating signal on failure
    pub signal: Option<String>,
}

impl DownloadOutcome {
    /// A successful outcome
    pub fn completed(filename: Option<String>) -> Self {
        Self {
            success: true,
            filename,
            ..Default::default()
        }
    }

    /// A failed outcome derived from the error that ended the request
    pub fn failed(error: &Error) -> Self {
        use crate::error::ToHttpStatus;

        let (exit_code, signal) = match error {
            Error::ExitFailed { code, signal, .. } => (*code, signal.clone()),
            _ => (None, None),
        };
        Self {
            success: false,
            filename: None,
            error_message: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
            exit_code,
            signal,
        }
    }
}

/// Payload of the `done` stream event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DonePayload {
    /// Always `true`; lets clients test one field on every terminal event
    #[serde(default = "done_success")]
    pub success: bool,
    /// Basename of the downloaded file, or null when it could not be determined
    pub filename: Option<String>,
}

impl DonePayload {
    /// Successful completion with the given filename
    pub fn new(filename: Option<String>) -> Self {
        Self {
            success: true,
            filename,
        }
    }
}

fn done_success() -> bool {
    true
}

/// Payload of the `error` stream event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    /// Human-readable error text
    pub message: String,
    /// Fetcher exit code, when the fetcher exited non-zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Fetcher terminating signal, when the fetcher was killed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
}

/// One message on a request's event stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A parsed fetcher output line
    Progress(ProgressEvent),
    /// The download finished successfully
    Done(DonePayload),
    /// The download failed
    Error(ErrorPayload),
}

impl StreamEvent {
    /// The SSE `event:` name for this message
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::Progress(_) => "progress",
            StreamEvent::Done(_) => "done",
            StreamEvent::Error(_) => "error",
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Progress(_))
    }

    /// JSON payload for the SSE `data:` field (untagged, flat object)
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            StreamEvent::Progress(progress) => serde_json::to_string(progress),
            StreamEvent::Done(done) => serde_json::to_string(done),
            StreamEvent::Error(error) => serde_json::to_string(error),
        }
    }
}

impl From<DownloadOutcome> for StreamEvent {
    fn from(outcome: DownloadOutcome) -> Self {
        if outcome.success {
            StreamEvent::Done(DonePayload::new(outcome.filename))
        } else {
            StreamEvent::Error(ErrorPayload {
                message: outcome
                    .error_message
                    .unwrap_or_else(|| "download failed".to_string()),
                code: outcome.exit_code,
                signal: outcome.signal,
            })
        }
    }
}
