//! Chat endpoint.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Create chat router
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    /// Present only when the history write fell back to local disk.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Run one chat round
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state
        .chat
        .chat(&req.message, req.session_id.as_deref())
        .await?;

    if let Some(reason) = &reply.degraded_reason {
        warn!(
            "History for {} written to local fallback: {}",
            reply.session_id, reason
        );
    }
    info!("Chat round completed for {}", reply.session_id);

    Ok(Json(ChatResponse {
        degraded: reply.is_degraded(),
        response: reply.response,
        session_id: reply.session_id.to_string(),
    }))
}
