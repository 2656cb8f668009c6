//! External fetcher handling
//!
//! This module wraps the command-line video fetcher (yt-dlp) behind the
//! [`Fetcher`] trait and turns its unstructured output into
//! [`ProgressEvent`](crate::types::ProgressEvent)s.
//!
//! ## Architecture
//!
//! - [`Fetcher`]: dry-run filename resolution and download spawning
//! - [`CliFetcher`]: runs the yt-dlp binary, passing arguments without a shell
//! - [`FetchProcess`]: one running download with its two output pipes
//! - [`LineDemuxer`]: reassembles lines from chunked pipe reads, per pipe
//! - [`parse_progress_line`]: permissive per-line field extraction

mod cli;
mod demux;
mod parser;
mod process;
mod traits;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cli::{CliFetcher, DEFAULT_BINARY};
pub use demux::{Channel, LineDemuxer, Lines};
pub use parser::parse_progress_line;
pub use process::{FetchProcess, OutputStream, ProcessControl};
pub use traits::Fetcher;
