//! REST handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use trackstream_core::StreamStatus;

use crate::state::AppState;

/// `GET /status` -- connection counts, ticks broadcast, and uptime.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StreamStatus> {
    Json(state.status())
}
