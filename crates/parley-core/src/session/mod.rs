//! Session identity.
//!
//! A session id becomes part of a storage key by plain concatenation, so it
//! is validated against an allow-list before any key is built:
//!
//! - 1-128 characters
//! - ASCII letters, digits, hyphens and underscores only
//!
//! Anything else (path separators, `..`, whitespace, unicode) is rejected
//! with [`Error::InvalidSessionId`].

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

/// File extension appended to a session id to form its storage key.
pub const CONVERSATION_EXTENSION: &str = ".json";

const MAX_SESSION_ID_LEN: usize = 128;

/// A validated session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a caller-supplied id.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::invalid_session_id(raw, "session id cannot be empty"));
        }

        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(Error::invalid_session_id(
                raw,
                format!("session id must be {} characters or less", MAX_SESSION_ID_LEN),
            ));
        }

        if let Some((i, c)) = raw
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(Error::invalid_session_id(
                raw,
                format!("invalid character {:?} at position {}", c, i),
            ));
        }

        Ok(Self(raw.to_string()))
    }

    /// Generate a fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Storage key for this session: `<id>.json`.
    pub fn storage_key(&self) -> String {
        format!("{}{}", self.0, CONVERSATION_EXTENSION)
    }

    /// Recover the session id from a storage key.
    ///
    /// Returns `None` for keys without the conversation extension or whose
    /// stem is not a valid session id.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let stem = key.strip_suffix(CONVERSATION_EXTENSION)?;
        Self::parse(stem).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
