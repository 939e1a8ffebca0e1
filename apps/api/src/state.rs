use std::sync::Arc;

use crate::config::Config;
use crate::discovery::tool::JobSearchTool;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the process-wide quota, seen-URL store, and existing-jobs cache.
    pub tool: Arc<JobSearchTool>,
    pub config: Config,
}
