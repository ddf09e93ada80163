//! Application state shared across handlers.

use std::sync::Arc;

use orchestrator::Orchestrator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Inbound message engine.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Create new application state.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}
