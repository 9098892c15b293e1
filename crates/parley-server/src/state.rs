//! Application state.

use parley_core::{ChatModel, ChatService, SessionCatalog, SessionMemoryStore, StorageBackend};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Conversation history per session
    pub store: SessionMemoryStore,
    /// Session listing
    pub catalog: SessionCatalog,
    /// Chat round orchestration
    pub chat: ChatService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: Config,
        backend: Arc<dyn StorageBackend>,
        model: Arc<dyn ChatModel>,
        system_prompt: String,
    ) -> Arc<Self> {
        let store = SessionMemoryStore::new(backend);
        Arc::new(Self {
            config: Arc::new(config),
            catalog: SessionCatalog::new(store.clone()),
            chat: ChatService::new(store.clone(), model, system_prompt),
            store,
            start_time: Instant::now(),
        })
    }
}
