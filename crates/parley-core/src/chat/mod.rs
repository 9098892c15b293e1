//! Chat orchestration.
//!
//! One chat round:
//!
//! ```text
//! message + session id?
//!   │
//!   ├─► resolve id (validate, or generate a new one)
//!   ├─► load history from the session memory store
//!   ├─► [system prompt] + history (role/content) + user message
//!   ├─► ChatModel::complete
//!   └─► append (user, assistant) and write back
//! ```

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::memory::SessionMemoryStore;
use crate::session::SessionId;
use crate::storage::PutOutcome;
use crate::types::{Role, Turn};

/// Instruction sent ahead of every conversation unless configured otherwise.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, friendly assistant. \
Answer clearly and concisely, and use the earlier messages in this conversation \
as context for your replies.";

/// A role/content pair as sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self::new(turn.role, turn.content.clone())
    }
}

/// A language model: ordered messages in, one assistant reply out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name for health reporting.
    fn name(&self) -> &str;

    /// Produce the assistant's reply. Failures are `Error::Provider`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Result of one chat round.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub session_id: SessionId,
    /// Set when the history write fell back to local disk.
    pub degraded_reason: Option<String>,
}

impl ChatReply {
    pub fn is_degraded(&self) -> bool {
        self.degraded_reason.is_some()
    }
}

/// Runs chat rounds against a model, persisting each round.
#[derive(Clone)]
pub struct ChatService {
    store: SessionMemoryStore,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl ChatService {
    pub fn new(
        store: SessionMemoryStore,
        model: Arc<dyn ChatModel>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            model,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run one round. An absent or empty `session_id` starts a new session.
    pub async fn chat(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply> {
        let session_id = match session_id.filter(|raw| !raw.is_empty()) {
            Some(raw) => SessionId::parse(raw)?,
            None => SessionId::generate(),
        };

        let history = self.store.load(&session_id).await?;
        let messages = self.build_messages(&history, message);
        debug!(
            "Sending {} messages to {} for {}",
            messages.len(),
            self.model.name(),
            session_id
        );

        let response = self.model.complete(&messages).await?;

        let outcome = self.store.append(&session_id, message, &response).await?;
        let degraded_reason = match outcome.write {
            PutOutcome::DegradedToLocal { reason } => Some(reason),
            PutOutcome::Written => None,
        };

        Ok(ChatReply {
            response,
            session_id,
            degraded_reason,
        })
    }

    /// Prompt for the model: system instruction, prior turns, new message.
    pub fn build_messages(&self, history: &[Turn], message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(Role::System, self.system_prompt.clone()));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::new(Role::User, message));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::MemoryBackend;
    use std::sync::Mutex;

    /// Echoes the last user message and records what it was sent.
    #[derive(Default)]
    struct EchoModel {
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(Error::provider("upstream unavailable"))
        }
    }

    fn service(model: Arc<dyn ChatModel>) -> (SessionMemoryStore, ChatService) {
        let store = SessionMemoryStore::new(Arc::new(MemoryBackend::new()));
        let chat = ChatService::new(store.clone(), model, "be brief");
        (store, chat)
    }

    #[tokio::test]
    async fn test_new_session_gets_generated_id() {
        let (store, chat) = service(Arc::new(EchoModel::default()));

        let reply = chat.chat("hi", None).await.unwrap();
        assert_eq!(reply.response, "echo: hi");
        assert!(!reply.is_degraded());

        let turns = store.load(&reply.session_id).await.unwrap();
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_session_id_starts_new_session() {
        let (_, chat) = service(Arc::new(EchoModel::default()));
        let reply = chat.chat("hi", Some("")).await.unwrap();
        assert!(!reply.session_id.as_str().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_replayed_in_order() {
        let model = Arc::new(EchoModel::default());
        let (_, chat) = service(model.clone());

        chat.chat("first", Some("s1")).await.unwrap();
        chat.chat("second", Some("s1")).await.unwrap();

        let seen = model.seen.lock().unwrap();
        let last_call = seen.last().unwrap();
        let roles: Vec<Role> = last_call.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(last_call[0].content, "be brief");
        assert_eq!(last_call[1].content, "first");
        assert_eq!(last_call[2].content, "echo: first");
        assert_eq!(last_call[3].content, "second");
    }

    #[tokio::test]
    async fn test_invalid_session_id_rejected_before_model_call() {
        let model = Arc::new(EchoModel::default());
        let (_, chat) = service(model.clone());

        let err = chat.chat("hi", Some("../etc/passwd")).await.unwrap_err();
        assert!(err.is_invalid_session_id());
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_writes_nothing() {
        let (store, chat) = service(Arc::new(FailingModel));

        let err = chat.chat("hi", Some("s1")).await.unwrap_err();
        assert!(err.is_provider());

        let id = SessionId::parse("s1").unwrap();
        assert!(store.load(&id).await.unwrap().is_empty());
    }

    #[test]
    fn test_build_messages_strips_timestamps() {
        let (_, chat) = service(Arc::new(EchoModel::default()));
        let history = vec![Turn::stamped(Role::User, "a"), Turn::stamped(Role::Assistant, "b")];

        let messages = chat.build_messages(&history, "c");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1], ChatMessage::new(Role::User, "a"));
        assert_eq!(messages[3], ChatMessage::new(Role::User, "c"));
    }
}
