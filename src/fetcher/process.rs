//! A running fetcher process and its output pipes

use crate::types::ExitReport;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::process::Child;

/// One output pipe of a fetcher process
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Lifecycle control over a fetcher process
///
/// Implemented for real child processes; tests provide scripted versions.
#[async_trait]
pub trait ProcessControl: Send {
    /// Wait for the process to exit
    async fn wait(&mut self) -> std::io::Result<ExitReport>;

    /// Ask the process to stop, escalating to a hard kill after `grace`
    async fn terminate(&mut self, grace: Duration) -> std::io::Result<ExitReport>;

    /// OS process id, while the process is still running
    fn id(&self) -> Option<u32>;
}

/// A fetcher invocation owned by exactly one request
///
/// Dropping it releases the pipes; a real child process is killed on drop.
pub struct FetchProcess {
    primary: OutputStream,
    secondary: OutputStream,
    control: Box<dyn ProcessControl>,
}

impl FetchProcess {
    /// Assemble a process from its parts
    pub fn new(
        primary: OutputStream,
        secondary: OutputStream,
        control: Box<dyn ProcessControl>,
    ) -> Self {
        Self {
            primary,
            secondary,
            control,
        }
    }

    /// Wrap a spawned child whose stdout and stderr are piped
    pub fn from_child(mut child: Child) -> std::io::Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr was not piped"))?;

        Ok(Self::new(
            Box::new(stdout),
            Box::new(stderr),
            Box::new(ChildControl { child }),
        ))
    }

    /// OS process id, while the process is still running
    pub fn id(&self) -> Option<u32> {
        self.control.id()
    }

    /// Split into (primary, secondary, control)
    pub fn into_parts(self) -> (OutputStream, OutputStream, Box<dyn ProcessControl>) {
        (self.primary, self.secondary, self.control)
    }
}

struct ChildControl {
    child: Child,
}

#[async_trait]
impl ProcessControl for ChildControl {
    async fn wait(&mut self) -> std::io::Result<ExitReport> {
        self.child.wait().await.map(ExitReport::from)
    }

    async fn terminate(&mut self, grace: Duration) -> std::io::Result<ExitReport> {
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                // SAFETY: kill(2) has no memory-safety preconditions; the pid comes
                // from a child we still own and have not reaped.
                let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
                if rc == 0 {
                    if let Ok(status) = tokio::time::timeout(grace, self.child.wait()).await {
                        return status.map(ExitReport::from);
                    }
                    tracing::warn!(pid, "yt-dlp ignored SIGTERM, killing");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = grace;
        }

        self.child.kill().await?;
        self.child.wait().await.map(ExitReport::from)
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }
}
