//! Error types for vidpull
//!
//! This module provides error handling for the library, including:
//! - The request-level error taxonomy (client errors, fetcher failures, I/O)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for vidpull operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vidpull
///
/// Every failure in a download request is converted into one of these at the
/// orchestrator boundary, then rendered as a single terminal event or response.
#[derive(Debug, Error)]
pub enum Error {
    /// The request was malformed or did not carry a usable link
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The fetcher could not report the output filename for a link
    #[error("filename resolution failed: {0}")]
    ResolutionFailed(String),

    /// The fetcher process could not be started (missing binary, permissions)
    #[error("failed to launch fetcher: {0}")]
    LaunchFailed(String),

    /// The fetcher process exited unsuccessfully
    #[error("{message}")]
    ExitFailed {
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Terminating signal name, if the process was killed
        signal: Option<String>,
        /// Human-readable description
        message: String,
    },

    /// The request was abandoned (client went away or the server is shutting down)
    #[error("download cancelled: {0}")]
    Cancelled(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "YTDLP_BACKEND_PORT")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build an [`Error::ExitFailed`] from a process exit report
    pub fn exit_failed(code: Option<i32>, signal: Option<String>) -> Self {
        let message = match (&code, &signal) {
            (Some(code), _) => format!("yt-dlp exited with code {code}"),
            (None, Some(signal)) => format!("yt-dlp was terminated by {signal}"),
            (None, None) => "yt-dlp exited abnormally".to_string(),
        };
        Error::ExitFailed {
            code,
            signal,
            message,
        }
    }

    /// Whether this error was caused by the client rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "exit_failed",
///     "message": "yt-dlp exited with code 1",
///     "details": { "exit_code": 1, "signal": null }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_request", "exit_failed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidRequest(_) => 400,
            Error::Config { .. } => 400,

            // 499-style client abort has no standard code; report as 503
            Error::Cancelled(_) => 503,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - The external fetcher failed
            Error::ResolutionFailed(_) => 502,
            Error::ExitFailed { .. } => 502,

            // 503 Service Unavailable - The fetcher is not runnable
            Error::LaunchFailed(_) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::ResolutionFailed(_) => "resolution_failed",
            Error::LaunchFailed(_) => "launch_failed",
            Error::ExitFailed { .. } => "exit_failed",
            Error::Cancelled(_) => "cancelled",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::ExitFailed { code, signal, .. } => Some(serde_json::json!({
                "exit_code": code,
                "signal": signal,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
