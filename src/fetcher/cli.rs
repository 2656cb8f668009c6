//! CLI-based fetcher using the external yt-dlp binary

use super::process::FetchProcess;
use super::traits::Fetcher;
use crate::config::Config;
use crate::error::Error;
use crate::utils::basename;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Name of the fetcher binary looked up on PATH
pub const DEFAULT_BINARY: &str = "yt-dlp";

/// Fetcher that runs yt-dlp as a subprocess
///
/// The link is always passed as a single argument after `--`, directly to the
/// process (no shell), so quotes, `$`, backticks, `;` or a leading `-` in a
/// link cannot change how the command is interpreted.
#[derive(Debug, Clone)]
pub struct CliFetcher {
    binary_path: PathBuf,
    launcher_args: Vec<String>,
    format: String,
    merge_output_format: String,
    output_template: PathBuf,
}

impl CliFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf, config: &Config) -> Self {
        Self {
            binary_path,
            launcher_args: config.fetcher.launcher_args.clone(),
            format: config.fetcher.format.clone(),
            merge_output_format: config.fetcher.merge_output_format.clone(),
            output_template: config.videos_dir().join(&config.fetcher.output_template),
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path(config: &Config) -> Option<Self> {
        which::which(DEFAULT_BINARY)
            .ok()
            .map(|path| Self::new(path, config))
    }

    /// Use the configured binary, else PATH discovery, else the bare binary name
    ///
    /// A missing binary surfaces later as [`Error::LaunchFailed`] per request.
    pub fn from_config(config: &Config) -> Self {
        match &config.fetcher.binary_path {
            Some(path) => Self::new(path.clone(), config),
            None => Self::from_path(config)
                .unwrap_or_else(|| Self::new(PathBuf::from(DEFAULT_BINARY), config)),
        }
    }

    /// Path of the executable that will be run
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Arguments shared by the dry run and the real download
    fn common_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.launcher_args.iter().map(OsString::from).collect();
        args.extend([
            OsString::from("-f"),
            OsString::from(&self.format),
            OsString::from("--merge-output-format"),
            OsString::from(&self.merge_output_format),
            OsString::from("-o"),
            self.output_template.clone().into_os_string(),
        ]);
        args
    }

    /// Full argument list for the filename dry run
    pub fn dry_run_args(&self, link: &str) -> Vec<OsString> {
        let mut args = self.common_args();
        args.push(OsString::from("--get-filename"));
        args.push(OsString::from("--"));
        args.push(OsString::from(link));
        args
    }

    /// Full argument list for the real download
    pub fn download_args(&self, link: &str) -> Vec<OsString> {
        let mut args = self.common_args();
        args.push(OsString::from("--newline"));
        args.push(OsString::from("--"));
        args.push(OsString::from(link));
        args
    }

    fn command(&self, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(args)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUTF8", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Fetcher for CliFetcher {
    async fn resolve_filename(&self, link: &str) -> crate::Result<String> {
        let output = self
            .command(self.dry_run_args(link))
            .output()
            .await
            .map_err(|e| Error::ResolutionFailed(format!("failed to execute yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::ResolutionFailed(format!(
                "yt-dlp failed to get filename: {detail}"
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .and_then(basename)
            .ok_or_else(|| Error::ResolutionFailed("could not determine filename".to_string()))
    }

    fn spawn(&self, link: &str) -> crate::Result<FetchProcess> {
        let child = self
            .command(self.download_args(link))
            .spawn()
            .map_err(|e| {
                Error::LaunchFailed(format!(
                    "failed to execute {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        tracing::debug!(pid = ?child.id(), binary = %self.binary_path.display(), "Spawned yt-dlp");

        FetchProcess::from_child(child).map_err(|e| Error::LaunchFailed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
