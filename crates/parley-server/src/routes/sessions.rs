//! Session history routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use parley_core::{SessionId, SessionSummary, Turn};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Create sessions router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/conversation/{session_id}", get(get_conversation))
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub session_id: String,
    pub messages: Vec<Turn>,
}

/// List all stored sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let sessions = state.catalog.list_sessions().await?;
    Ok(Json(SessionsResponse { sessions }))
}

/// Full history of one session; unknown sessions are empty
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let session_id = SessionId::parse(&session_id)?;
    let messages = state.store.load(&session_id).await?;
    Ok(Json(ConversationResponse {
        session_id: session_id.to_string(),
        messages,
    }))
}
