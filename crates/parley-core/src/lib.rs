//! parley-core - Core library for the Parley chat service
//!
//! This crate provides everything below the HTTP surface:
//!
//! - **storage**: Key/value object backends (local disk, S3, in-memory) and
//!   the S3-with-local-fallback wrapper
//! - **memory**: Per-session conversation history and the session catalog
//! - **session**: Validated session identifiers and their storage keys
//! - **chat**: Model abstraction and the chat round orchestration
//! - **types**: Conversation turns, summaries, timestamps

pub mod chat;
pub mod error;
pub mod memory;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use chat::{ChatModel, ChatReply, ChatService};
pub use error::{Error, Result};
pub use memory::{SessionCatalog, SessionMemoryStore};
pub use session::SessionId;
pub use storage::{StorageBackend, StorageConfig};
pub use types::{Conversation, Role, SessionSummary, Turn};
