//! Per-request event channel
//!
//! A bounded, one-way channel from the orchestrator to whoever renders the
//! stream (the SSE handler). Progress events may be sent any number of times;
//! the terminal outcome is sent by [`EventChannel::finish`], which consumes
//! the sender so nothing can follow it.

use crate::types::{DownloadOutcome, ProgressEvent, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The receiving side dropped the stream (client went away)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event stream receiver disconnected")]
pub struct Disconnected;

/// Sending half of a request's event stream
#[derive(Debug)]
pub struct EventChannel {
    tx: mpsc::Sender<StreamEvent>,
}

/// Create a channel buffering up to `buffer` undelivered events
///
/// The sender blocks when the buffer is full, back-pressuring the fetcher
/// output reader rather than growing without bound.
pub fn event_channel(buffer: usize) -> (EventChannel, ReceiverStream<StreamEvent>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (EventChannel { tx }, ReceiverStream::new(rx))
}

impl EventChannel {
    /// Push one progress event
    pub async fn send_progress(&self, event: ProgressEvent) -> Result<(), Disconnected> {
        self.tx
            .send(StreamEvent::Progress(event))
            .await
            .map_err(|_| Disconnected)
    }

    /// Push the terminal event and close the channel
    ///
    /// Returns whether the receiver was still there to get it.
    pub async fn finish(self, outcome: DownloadOutcome) -> bool {
        self.tx.send(StreamEvent::from(outcome)).await.is_ok()
    }

    #[cfg(test)]
    pub(crate) fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the receiver has been dropped
    pub async fn disconnected(&self) {
        self.tx.closed().await
    }
}
