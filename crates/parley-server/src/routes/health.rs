//! Service info and health check endpoints.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub memory_enabled: bool,
    pub storage: String,
    pub ai_model: String,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub use_s3: bool,
    pub storage_backend: String,
    /// Sessions whose latest write only reached the local fallback.
    pub degraded_sessions: usize,
    pub model: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Root endpoint
pub async fn root(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Parley chat service".to_string(),
        memory_enabled: true,
        storage: state.config.storage_label().to_string(),
        ai_model: state.chat.model_name().to_string(),
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        use_s3: state.config.use_s3,
        storage_backend: state.store.backend().describe().to_string(),
        degraded_sessions: state.store.backend().degraded_keys().len(),
        model: state.chat.model_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
