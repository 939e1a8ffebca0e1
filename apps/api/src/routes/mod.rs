pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::discovery::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Tool invocation boundary
        .route(
            "/api/v1/tools/job-search",
            post(handlers::handle_job_search),
        )
        // Turn lifecycle
        .route("/api/v1/turns/reset", post(handlers::handle_reset_turn))
        .route("/api/v1/turns/stats", get(handlers::handle_turn_stats))
        // CRM cache
        .route(
            "/api/v1/existing-jobs/invalidate",
            post(handlers::handle_invalidate_existing_jobs),
        )
        .with_state(state)
}
