use std::sync::Arc;

use crate::worker::StatsTracker;

/// Shared state for the operator HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<StatsTracker>,
    /// Requirement ids loaded at start-up, sorted.
    pub requirements: Arc<Vec<String>>,
    pub queue_name: String,
    pub workers: usize,
}
