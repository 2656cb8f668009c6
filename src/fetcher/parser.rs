//! Parser for yt-dlp progress output
//!
//! The fetcher's text output is not a stable format, so every field is
//! extracted by its own pattern and a line that matches none of them is still
//! a valid event carrying only the raw text.

use crate::types::ProgressEvent;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,3}(?:\.[0-9]+)?)%").expect("valid percent regex"));

#[allow(clippy::expect_used)]
static SPEED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bat\s+([0-9.]+[A-Za-z]+/?[A-Za-z]*)").expect("valid speed regex"));

#[allow(clippy::expect_used)]
static ETA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bETA\s+([0-9:]+)").expect("valid ETA regex"));

#[allow(clippy::expect_used)]
static TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bof\s+(?:~\s*)?([0-9.]+[A-Za-z]+)").expect("valid total size regex")
});

#[allow(clippy::expect_used)]
static STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[download\]\s+(.*)$").expect("valid status regex"));

/// Parse one fetcher output line into a [`ProgressEvent`]
///
/// Never fails. Fields whose pattern does not match are left as `None`.
///
/// # Examples
///
/// ```
/// use vidpull::fetcher::parse_progress_line;
///
/// let event = parse_progress_line("[download]   12.3% of 10.34MiB at 123.45KiB/s ETA 00:01");
/// assert_eq!(event.percent, Some(12.3));
/// assert_eq!(event.total.as_deref(), Some("10.34MiB"));
/// assert_eq!(event.speed.as_deref(), Some("123.45KiB/s"));
/// assert_eq!(event.eta.as_deref(), Some("00:01"));
/// ```
pub fn parse_progress_line(line: &str) -> ProgressEvent {
    ProgressEvent {
        raw: line.to_string(),
        percent: capture(&PERCENT, line)
            .and_then(|pct| pct.parse::<f64>().ok())
            .filter(|pct| (0.0..=100.0).contains(pct)),
        speed: capture(&SPEED, line).map(str::to_string),
        eta: capture(&ETA, line).map(str::to_string),
        total: capture(&TOTAL, line).map(str::to_string),
        status: capture(&STATUS, line)
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .map(str::to_string),
    }
}

fn capture<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
