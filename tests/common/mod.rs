//! Common test utilities for vidpull integration tests
//!
//! Provides a stand-in for yt-dlp: a POSIX shell script run through
//! `/bin/sh`, configured the same way a Python launcher would be
//! (`binary_path` plus `launcher_args`).

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use vidpull::{CliFetcher, Config, DownloadOrchestrator};

/// Name the fake fetcher gives every download
pub const FAKE_TITLE: &str = "Fake Title.mp4";

/// Behaviour is chosen by substrings of the link:
/// - `fail`    - download exits 3 after an error line
/// - `nodry`   - every dry run fails
/// - `flaky`   - the first dry run fails, later ones succeed
/// - `slow`    - prints one progress line, then sleeps
/// - `killed`  - download terminates itself with SIGKILL
///
/// Every argument is logged to `args.log` as `[arg]`, one per line.
const FAKE_YT_DLP: &str = r#"
here="$(dirname "$0")"
spy="$here/args.log"
out=""
link=""
dry=0
while [ $# -gt 0 ]; do
    printf '[%s]\n' "$1" >> "$spy"
    case "$1" in
        -o) shift; printf '[%s]\n' "$1" >> "$spy"; out="$1" ;;
        --get-filename) dry=1 ;;
        --) shift; printf '[%s]\n' "$1" >> "$spy"; link="$1" ;;
    esac
    shift
done
dir="$(dirname "$out")"

if [ "$dry" = 1 ]; then
    case "$link" in
        *nodry*) echo "ERROR: dry run unsupported" >&2; exit 1 ;;
        *flaky*)
            if [ ! -f "$here/flaky.marker" ]; then
                touch "$here/flaky.marker"
                echo "ERROR: temporary failure" >&2
                exit 1
            fi
            ;;
    esac
    printf '%s\n' "$dir/Fake Title.mp4"
    exit 0
fi

case "$link" in
    *fail*)
        echo "ERROR: [generic] Unsupported URL: $link" >&2
        exit 3
        ;;
    *killed*)
        kill -9 $$
        ;;
    *slow*)
        echo "$$" > "$here/pid"
        printf '[download]   1.0%% of 10.00MiB at 1.00MiB/s ETA 00:10\n'
        exec sleep 30
        ;;
esac

echo "[youtube] video: Downloading webpage"
printf '[download]  50.0%% of 10.00MiB at 2.00MiB/s ETA 00:02\n'
echo "WARNING: something minor" >&2
printf '[download] 100%% of 10.00MiB\n'
printf 'fake video' > "$dir/Fake Title.mp4"
printf '[Merger] done without newline'
exit 0
"#;

/// A temp workspace holding the fake fetcher and a videos directory
pub struct FakeYtDlp {
    pub dir: TempDir,
    pub config: Config,
}

impl FakeYtDlp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("yt-dlp.sh");
        std::fs::write(&script, FAKE_YT_DLP).expect("write fake yt-dlp");

        let mut config = Config::default();
        config.download.videos_dir = dir.path().join("videos");
        config.fetcher.binary_path = Some(PathBuf::from("/bin/sh"));
        config.fetcher.launcher_args = vec![script.to_string_lossy().into_owned()];
        config.fetcher.kill_grace_period = std::time::Duration::from_millis(500);
        config.server.event_buffer = 8;

        Self { dir, config }
    }

    pub fn orchestrator(&self) -> Arc<DownloadOrchestrator> {
        let fetcher = Arc::new(CliFetcher::from_config(&self.config));
        Arc::new(DownloadOrchestrator::new(fetcher, &self.config))
    }

    pub fn videos_dir(&self) -> &Path {
        self.config.videos_dir()
    }

    /// Every argument the fake fetcher has received so far
    pub fn logged_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args.log"))
            .unwrap_or_default()
            .lines()
            .map(|line| {
                line.strip_prefix('[')
                    .and_then(|l| l.strip_suffix(']'))
                    .unwrap_or(line)
                    .to_string()
            })
            .collect()
    }

    /// PID written by a `slow` download
    pub fn slow_pid(&self) -> Option<i32> {
        std::fs::read_to_string(self.dir.path().join("pid"))
            .ok()
            .and_then(|pid| pid.trim().parse().ok())
    }
}

/// Whether a process with this pid still exists (zombies count as gone once reaped)
pub fn process_alive(pid: i32) -> bool {
    // SAFETY: signal 0 performs only the existence and permission check
    unsafe { libc::kill(pid, 0) == 0 }
}
