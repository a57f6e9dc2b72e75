//! Session lookup.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use storycast_core::ids::SessionId;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::hub::SessionRecord;
use crate::state::AppState;

/// GET /sessions/{session_id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionRecord>, ApiError> {
    let session_id = SessionId(session_id);
    state
        .hub
        .session(session_id)
        .map(Json)
        .ok_or(ApiError::SessionNotFound(session_id))
}

/// Returns the router for session queries.
pub fn router() -> Router<AppState> {
    Router::new().route("/{session_id}", get(get_session))
}
