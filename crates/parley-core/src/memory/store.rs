//! Backend-agnostic session memory store.

use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::SessionId;
use crate::storage::{PutOutcome, StorageBackend};
use crate::types::{Role, Turn};

use super::codec;

/// Content type recorded for conversation objects.
pub const CONVERSATION_CONTENT_TYPE: &str = "application/json";

/// Result of an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Turns in the conversation after the append.
    pub message_count: usize,
    /// How the write landed.
    pub write: PutOutcome,
}

impl AppendOutcome {
    pub fn is_degraded(&self) -> bool {
        self.write.is_degraded()
    }
}

/// Maps session ids to their persisted conversations.
///
/// Every call round-trips through the backend; nothing is cached. `append`
/// is read-modify-write without compare-and-swap, so two concurrent appends
/// to the same session race and the later write wins. Callers that need
/// strict ordering must serialize appends per session themselves.
#[derive(Clone)]
pub struct SessionMemoryStore {
    backend: Arc<dyn StorageBackend>,
}

impl SessionMemoryStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Load a session's turns. A session that was never written is empty.
    pub async fn load(&self, session_id: &SessionId) -> Result<Vec<Turn>> {
        let key = session_id.storage_key();
        let bytes = match self.backend.get(&key).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                debug!("No conversation stored for {}", session_id);
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::store(session_id.as_str(), e)),
        };

        codec::decode(&bytes).map_err(|source| Error::Decode {
            session_id: session_id.to_string(),
            source,
        })
    }

    /// Append one chat round: the user turn, then the assistant turn, each
    /// stamped at the moment it is created.
    pub async fn append(
        &self,
        session_id: &SessionId,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<AppendOutcome> {
        let mut turns = self.load(session_id).await?;
        turns.push(Turn::stamped(Role::User, user_content));
        turns.push(Turn::stamped(Role::Assistant, assistant_content));

        let write = self.save(session_id, &turns).await?;
        Ok(AppendOutcome {
            message_count: turns.len(),
            write,
        })
    }

    /// Overwrite a session with `turns`.
    async fn save(&self, session_id: &SessionId, turns: &[Turn]) -> Result<PutOutcome> {
        let bytes = codec::encode(turns).map_err(|e| Error::Serialization(e.to_string()))?;
        let key = session_id.storage_key();

        let outcome = self
            .backend
            .put(&key, &bytes, CONVERSATION_CONTENT_TYPE)
            .await
            .map_err(|e| Error::store(session_id.as_str(), e))?;

        debug!("Saved {} turns for {}", turns.len(), session_id);
        Ok(outcome)
    }
}
