//! Session memory: persisted conversation history per session.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   load / append   ┌────────────────────┐
//! │   ChatService    │──────────────────▶│ SessionMemoryStore │
//! └──────────────────┘                   └─────────┬──────────┘
//!                                                  │ get / put
//! ┌──────────────────┐   list / stat     ┌─────────▼──────────┐
//! │  SessionCatalog  │──────────────────▶│   StorageBackend   │
//! └──────────────────┘                   │ local | s3 | memory│
//!                                        └────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use parley_core::memory::{SessionCatalog, SessionMemoryStore};
//! use parley_core::storage::{connect, StorageConfig};
//!
//! let backend = connect(&StorageConfig::Local { root: "../memory".into() }).await?;
//! let store = SessionMemoryStore::new(backend);
//!
//! let id = SessionId::parse("s1")?;
//! store.append(&id, "hi", "hello!").await?;
//! let turns = store.load(&id).await?;
//!
//! let sessions = SessionCatalog::new(store).list_sessions().await?;
//! ```

mod catalog;
pub mod codec;
mod store;

pub use catalog::*;
pub use store::*;
