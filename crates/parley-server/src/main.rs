//! parley-server - Parley chat backend
//!
//! REST API over TCP: chat rounds with per-session memory, plus read-only
//! session history.

use anyhow::Context;
use parley_core::chat::OpenAiChatModel;
use parley_core::storage;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod error;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("parley_server=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("parley-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::Config::load()?;

    let backend = storage::connect(&config.storage_config()).await?;
    info!("Conversation storage: {}", backend.describe());

    let model = OpenAiChatModel::new(config.openai_api_key.clone())?
        .with_model(config.openai_model.clone())
        .with_base_url(config.openai_base_url.clone());
    if !model.has_api_key() {
        warn!("OPENAI_API_KEY is not set; chat requests will fail");
    }
    info!("Chat model: {}", config.openai_model);

    let system_prompt = config.load_system_prompt()?;
    let addr = config.bind_address();

    let state = state::AppState::new(config, backend, Arc::new(model), system_prompt);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
