//! Scripted in-memory fetcher for tests

use super::process::{FetchProcess, OutputStream, ProcessControl};
use super::traits::Fetcher;
use crate::error::{Error, Result};
use crate::types::ExitReport;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::DuplexStream;

/// What the scripted fetcher process does once spawned
#[derive(Clone)]
pub(crate) enum Script {
    /// Emit fixed output on both pipes, then exit
    Output {
        stdout: &'static str,
        stderr: &'static str,
        exit: ExitReport,
    },
    /// Never write, never exit until terminated
    Hang,
    /// Fail to start
    LaunchError,
}

struct ScriptedControl {
    exit: Option<ExitReport>,
    terminated: Arc<AtomicBool>,
    // Held so the read halves stay open until termination
    writers: Vec<DuplexStream>,
}

#[async_trait]
impl ProcessControl for ScriptedControl {
    async fn wait(&mut self) -> std::io::Result<ExitReport> {
        match &self.exit {
            Some(exit) => Ok(exit.clone()),
            None => std::future::pending().await,
        }
    }

    async fn terminate(&mut self, _grace: Duration) -> std::io::Result<ExitReport> {
        self.terminated.store(true, Ordering::SeqCst);
        self.writers.clear();
        Ok(ExitReport {
            code: None,
            signal: Some("SIGTERM".to_string()),
        })
    }

    fn id(&self) -> Option<u32> {
        Some(4242)
    }
}

/// Fetcher whose dry runs and downloads follow a script
pub(crate) struct MockFetcher {
    resolutions: Mutex<VecDeque<Result<String>>>,
    resolve_delay: Duration,
    resolve_calls: AtomicUsize,
    script: Script,
    spawned: AtomicUsize,
    spawned_links: Mutex<Vec<String>>,
    terminated: Arc<AtomicBool>,
}

impl MockFetcher {
    /// Dry runs answer with `resolutions` in order, then fail
    pub(crate) fn new(script: Script, resolutions: Vec<Result<String>>) -> Arc<Self> {
        Self::with_resolve_delay(script, resolutions, Duration::ZERO)
    }

    /// Like [`MockFetcher::new`], but every dry run takes `delay` first
    pub(crate) fn with_resolve_delay(
        script: Script,
        resolutions: Vec<Result<String>>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolutions: Mutex::new(resolutions.into()),
            resolve_delay: delay,
            resolve_calls: AtomicUsize::new(0),
            script,
            spawned: AtomicUsize::new(0),
            spawned_links: Mutex::new(Vec::new()),
            terminated: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Prints `stdout`, exits zero, and resolves to `filename`
    pub(crate) fn succeeding(stdout: &'static str, filename: &str) -> Arc<Self> {
        Self::new(
            Script::Output {
                stdout,
                stderr: "",
                exit: ExitReport::success(),
            },
            vec![Ok(filename.to_string())],
        )
    }

    pub(crate) fn resolve_count(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub(crate) fn spawned_links(&self) -> Vec<String> {
        self.spawned_links
            .lock()
            .map(|links| links.clone())
            .unwrap_or_default()
    }

    pub(crate) fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn resolve_filename(&self, _link: &str) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if !self.resolve_delay.is_zero() {
            tokio::time::sleep(self.resolve_delay).await;
        }
        let next = self
            .resolutions
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        next.unwrap_or_else(|| Err(Error::ResolutionFailed("no scripted answer".into())))
    }

    fn spawn(&self, link: &str) -> Result<FetchProcess> {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut links) = self.spawned_links.lock() {
            links.push(link.to_string());
        }

        match &self.script {
            Script::Output {
                stdout,
                stderr,
                exit,
            } => {
                let primary: OutputStream = Box::new(Cursor::new(stdout.as_bytes().to_vec()));
                let secondary: OutputStream = Box::new(Cursor::new(stderr.as_bytes().to_vec()));
                Ok(FetchProcess::new(
                    primary,
                    secondary,
                    Box::new(ScriptedControl {
                        exit: Some(exit.clone()),
                        terminated: Arc::clone(&self.terminated),
                        writers: Vec::new(),
                    }),
                ))
            }
            Script::Hang => {
                let (primary, primary_writer) = tokio::io::duplex(64);
                let (secondary, secondary_writer) = tokio::io::duplex(64);
                Ok(FetchProcess::new(
                    Box::new(primary),
                    Box::new(secondary),
                    Box::new(ScriptedControl {
                        exit: None,
                        terminated: Arc::clone(&self.terminated),
                        writers: vec![primary_writer, secondary_writer],
                    }),
                ))
            }
            Script::LaunchError => Err(Error::LaunchFailed(
                "failed to execute yt-dlp: No such file or directory".into(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
