use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::discovery::quota::TurnStats;
use crate::errors::AppError;
use crate::models::listing::{SearchRequest, ToolOutput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobSearchBody {
    pub session_id: String,
    #[serde(flatten)]
    pub request: SearchRequest,
}

/// POST /api/v1/tools/job-search
pub async fn handle_job_search(
    State(state): State<AppState>,
    Json(body): Json<JobSearchBody>,
) -> Result<Json<ToolOutput>, AppError> {
    if body.session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id is required".to_string()));
    }
    if body.request.query.trim().is_empty() {
        return Err(AppError::Validation("query is required".to_string()));
    }

    // Fires on deadline, or when this handler is dropped (client went away).
    let cancel = CancellationToken::new();
    let _drop_guard = cancel.clone().drop_guard();
    let deadline = state.config.tool_deadline;
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(deadline) => cancel.cancel(),
            }
        }
    });

    let invocation_id = Uuid::new_v4();
    let output = state
        .tool
        .run(&body.session_id, &body.request, &cancel)
        .instrument(tracing::info_span!("job_search", %invocation_id))
        .await;

    Ok(Json(output))
}

/// POST /api/v1/turns/reset
pub async fn handle_reset_turn(State(state): State<AppState>) -> StatusCode {
    state.tool.reset_for_new_turn();
    StatusCode::NO_CONTENT
}

/// POST /api/v1/existing-jobs/invalidate
///
/// Called after the CRM changes so the next search sees the new records.
pub async fn handle_invalidate_existing_jobs(State(state): State<AppState>) -> StatusCode {
    state.tool.invalidate_existing_jobs();
    StatusCode::NO_CONTENT
}

/// GET /api/v1/turns/stats
pub async fn handle_turn_stats(State(state): State<AppState>) -> Json<TurnStats> {
    Json(state.tool.turn_stats())
}
