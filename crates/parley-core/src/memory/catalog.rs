//! Read-only listing of every stored session.

use tracing::debug;

use crate::error::Result;
use crate::session::{CONVERSATION_EXTENSION, SessionId};
use crate::storage::ObjectTimes;
use crate::types::{SessionSummary, Turn, format_timestamp};

use super::SessionMemoryStore;

/// Enumerates sessions by scanning the backend's key namespace.
#[derive(Clone)]
pub struct SessionCatalog {
    store: SessionMemoryStore,
}

impl SessionCatalog {
    pub fn new(store: SessionMemoryStore) -> Self {
        Self { store }
    }

    /// Summaries for every key ending in the conversation extension, in
    /// backend listing order.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let backend = self.store.backend();
        let keys = backend.list("").await?;

        let mut sessions = Vec::new();
        for key in keys.iter().filter(|key| key.ends_with(CONVERSATION_EXTENSION)) {
            let Some(session_id) = SessionId::from_storage_key(key) else {
                debug!("Skipping key with invalid session id: {}", key);
                continue;
            };

            let turns = self.store.load(&session_id).await?;
            let mut summary = summarize(&session_id, &turns);

            if summary.created_at.is_none() || summary.last_message_timestamp.is_none() {
                // Best-effort: a stat failure just leaves the fields empty
                let times = match backend.stat(key).await {
                    Ok(times) => times,
                    Err(e) => {
                        debug!("Could not stat {}: {}", key, e);
                        None
                    }
                };
                apply_object_times(&mut summary, times);
            }

            sessions.push(summary);
        }

        Ok(sessions)
    }
}

/// Build a summary from turns alone.
pub fn summarize(session_id: &SessionId, turns: &[Turn]) -> SessionSummary {
    SessionSummary {
        session_id: session_id.to_string(),
        message_count: turns.len(),
        last_message: turns.last().map(|turn| turn.content.clone()),
        created_at: turns.iter().find_map(Turn::timestamp).map(str::to_string),
        last_message_timestamp: turns.iter().rev().find_map(Turn::timestamp).map(str::to_string),
    }
}

fn apply_object_times(summary: &mut SessionSummary, times: Option<ObjectTimes>) {
    let Some(times) = times else {
        return;
    };
    if summary.created_at.is_none() {
        summary.created_at = times.created.as_ref().map(format_timestamp);
    }
    if summary.last_message_timestamp.is_none() {
        summary.last_message_timestamp = times.modified.as_ref().map(format_timestamp);
    }
}
