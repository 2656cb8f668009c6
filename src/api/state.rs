//! Application state for the API server

use crate::{Config, DownloadOrchestrator};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone). Nothing in it is
/// mutated after startup; per-download state lives with the orchestrator task.
#[derive(Clone)]
pub struct AppState {
    /// Runs download requests
    pub orchestrator: Arc<DownloadOrchestrator>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(orchestrator: Arc<DownloadOrchestrator>, config: Arc<Config>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }
}
