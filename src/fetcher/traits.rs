//! Fetcher abstraction

use super::process::FetchProcess;
use async_trait::async_trait;

/// An external tool that downloads a video for a link
///
/// Implementations must use identical format and output-template parameters
/// for [`resolve_filename`](Fetcher::resolve_filename) and
/// [`spawn`](Fetcher::spawn), so the resolved name is the name actually written.
///
/// # Examples
///
/// ```no_run
/// use vidpull::fetcher::{CliFetcher, Fetcher};
/// use vidpull::Config;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = CliFetcher::from_config(&Config::default());
/// let filename = fetcher.resolve_filename("dQw4w9WgXcQ").await?;
/// println!("will write {filename}");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Ask the fetcher which file a download of `link` would produce, without downloading
    ///
    /// Returns the basename of the output file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ResolutionFailed`] if the fetcher cannot be run,
    /// exits non-zero, or prints no filename.
    async fn resolve_filename(&self, link: &str) -> crate::Result<String>;

    /// Start downloading `link`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LaunchFailed`] if the process cannot be started.
    fn spawn(&self, link: &str) -> crate::Result<FetchProcess>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
