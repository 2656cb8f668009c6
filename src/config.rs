//! Configuration types for vidpull

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable holding the backend listening port
pub const ENV_PORT: &str = "YTDLP_BACKEND_PORT";
/// Environment variable overriding the videos directory
pub const ENV_VIDEOS_DIR: &str = "VIDEOS_DIR";
/// Environment variable overriding the fetcher binary
pub const ENV_FETCHER_PATH: &str = "YTDLP_PATH";
/// Environment variable enabling static front-end serving
pub const ENV_STATIC_DIR: &str = "STATIC_DIR";

/// Destination settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Directory the fetcher writes into and `/videos` serves from (default: "./public/videos")
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            videos_dir: default_videos_dir(),
        }
    }
}

/// External fetcher (yt-dlp) invocation settings
///
/// The same format and output template are used for the dry-run filename
/// lookup and for the real download, so both agree on the produced name.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetcherConfig {
    /// Path to the yt-dlp executable (auto-detected on PATH if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Arguments placed before the fetcher flags (e.g. `["-m", "yt_dlp"]` for a Python launcher)
    #[serde(default)]
    pub launcher_args: Vec<String>,

    /// Format selector passed with `-f` (default: "bestvideo+bestaudio")
    #[serde(default = "default_format")]
    pub format: String,

    /// Container passed with `--merge-output-format` (default: "mp4")
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,

    /// Output filename template, joined onto the videos directory (default: "%(title)s.%(ext)s")
    #[serde(default = "default_output_template")]
    pub output_template: String,

    /// How long to wait after SIGTERM before killing the fetcher outright (default: 5s)
    #[serde(default = "default_kill_grace_period", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub kill_grace_period: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            launcher_args: Vec::new(),
            format: default_format(),
            merge_output_format: default_merge_output_format(),
            output_template: default_output_template(),
            kill_grace_period: default_kill_grace_period(),
        }
    }
}

/// HTTP API settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind the API server to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Interval between SSE keep-alive comments (default: 15s)
    #[serde(default = "default_keep_alive_interval", with = "duration_millis")]
    #[schema(value_type = u64)]
    pub keep_alive_interval: Duration,

    /// Number of events buffered per stream before the fetcher is back-pressured (default: 64)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Front-end directory served for unmatched paths (disabled if None)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Serve Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            keep_alive_interval: default_keep_alive_interval(),
            event_buffer: default_event_buffer(),
            static_dir: None,
            swagger_ui: false,
        }
    }
}

/// Main configuration
///
/// Process-wide and read-only once the server starts; nothing else is shared
/// between requests.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Destination settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Fetcher invocation settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// HTTP API settings
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Videos directory
    pub fn videos_dir(&self) -> &PathBuf {
        &self.download.videos_dir
    }

    /// Build a configuration from the defaults overlaid with environment variables
    ///
    /// Reads [`ENV_PORT`], [`ENV_VIDEOS_DIR`], [`ENV_FETCHER_PATH`] and
    /// [`ENV_STATIC_DIR`]. Unset or empty variables keep the default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading values through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(port) = get(ENV_PORT) {
            let port: u16 = port.trim().parse().map_err(|_| Error::Config {
                message: format!("'{port}' is not a valid port number"),
                key: Some(ENV_PORT.to_string()),
            })?;
            config.server.bind_address.set_port(port);
        }
        if let Some(dir) = get(ENV_VIDEOS_DIR) {
            config.download.videos_dir = PathBuf::from(dir);
        }
        if let Some(path) = get(ENV_FETCHER_PATH) {
            config.fetcher.binary_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = get(ENV_STATIC_DIR) {
            config.server.static_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.format.trim().is_empty() {
            return Err(Error::Config {
                message: "fetcher format must not be empty".into(),
                key: Some("fetcher.format".into()),
            });
        }
        let template = &self.fetcher.output_template;
        if template.trim().is_empty() {
            return Err(Error::Config {
                message: "output template must not be empty".into(),
                key: Some("fetcher.output_template".into()),
            });
        }
        // Files must land directly in the videos directory to be served by basename
        if template.contains('/') || template.contains('\\') {
            return Err(Error::Config {
                message: format!("output template '{template}' must not contain a path separator"),
                key: Some("fetcher.output_template".into()),
            });
        }
        if self.server.event_buffer == 0 {
            return Err(Error::Config {
                message: "event buffer must be at least 1".into(),
                key: Some("server.event_buffer".into()),
            });
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("./public/videos")
}

fn default_format() -> String {
    "bestvideo+bestaudio".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

fn default_kill_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_keep_alive_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_event_buffer() -> usize {
    64
}
