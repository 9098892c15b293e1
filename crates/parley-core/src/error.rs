//! Error types for parley-core.

use thiserror::Error;

use crate::storage::BackendError;

/// Result type alias using parley-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for parley operations
#[derive(Error, Debug)]
pub enum Error {
    // Session identity errors
    #[error("Invalid session id {id:?}: {reason}")]
    InvalidSessionId { id: String, reason: String },

    // Storage errors
    #[error("Storage error for session {session_id}: {source}")]
    Store {
        session_id: String,
        #[source]
        source: BackendError,
    },

    #[error("Storage error: {0}")]
    Backend(#[from] BackendError),

    #[error("Corrupt conversation for session {session_id}: {source}")]
    Decode {
        session_id: String,
        #[source]
        source: serde_json::Error,
    },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Model provider errors
    #[error("Model provider error: {0}")]
    Provider(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid session id error
    pub fn invalid_session_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSessionId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a backend failure with the session it happened on
    pub fn store(session_id: impl Into<String>, source: BackendError) -> Self {
        Self::Store {
            session_id: session_id.into(),
            source,
        }
    }

    /// Create a provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Check if this error was caused by a malformed session id
    pub fn is_invalid_session_id(&self) -> bool {
        matches!(self, Self::InvalidSessionId { .. })
    }

    /// Check if this error came from the model provider
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}
