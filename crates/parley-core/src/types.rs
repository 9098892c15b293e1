//! Shared types for parley-core.
//!
//! These types describe what is persisted per session and what the catalog
//! reports back to the HTTP layer.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Conversation Types
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
///
/// The timestamp is kept as the exact string read from storage so that a
/// load/save cycle never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Turns stored without a role are assistant replies.
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Turn {
    /// Create a turn stamped with the current UTC instant.
    pub fn stamped(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(now_timestamp()),
        }
    }

    /// Create a turn without a timestamp.
    pub fn unstamped(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    /// The timestamp, treating an empty string the same as an absent one.
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref().filter(|ts| !ts.is_empty())
    }
}

fn default_role() -> Role {
    Role::Assistant
}

/// Ordered turns of one session, in insertion order.
pub type Conversation = Vec<Turn>;

/// Derived per-session metadata reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: usize,
    pub last_message: Option<String>,
    pub created_at: Option<String>,
    pub last_message_timestamp: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamps
// ─────────────────────────────────────────────────────────────────────────────

/// Format an instant the way conversation files store it:
/// `2024-01-15T10:30:00.123456Z`, or `2024-01-15T10:30:00Z` when the
/// microsecond part is zero.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    let precision = if dt.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    dt.to_rfc3339_opts(precision, true)
}

/// Current UTC instant in conversation-file format.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Parse a stored timestamp. Accepts RFC 3339 with or without an offset
/// suffix; naive values are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
