//! Byte-level storage backends for conversation files.
//!
//! Every backend exposes the same capability set over a flat key namespace:
//!
//! ```text
//! get(key)                      -> bytes | NotFound
//! put(key, bytes, content_type) -> Written | DegradedToLocal
//! list(prefix)                  -> [key]          (missing namespace = [])
//! stat(key)                     -> object times   (best-effort)
//! ```
//!
//! The concrete backend is chosen once, at start-up, from a [`StorageConfig`]
//! and then shared as `Arc<dyn StorageBackend>`.

mod fallback;
mod local;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use fallback::*;
pub use local::*;
pub use memory::*;
#[cfg(feature = "s3")]
pub use s3::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Failures reported by a storage medium.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Invalid storage key: {key:?}")]
    InvalidKey { key: String },

    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error on {key}: {message}")]
    Transport {
        key: String,
        message: String,
        transient: bool,
    },

    #[error("Backend lock poisoned")]
    LockPoisoned,
}

impl BackendError {
    /// Map an IO error, turning a missing file into `NotFound`.
    pub fn from_io(key: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                key: key.to_string(),
            }
        } else {
            Self::Io {
                key: key.to_string(),
                source,
            }
        }
    }

    /// Map an IO error from a write. A write never reports `NotFound`.
    pub fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure is worth retrying elsewhere (timeouts, dropped
    /// connections, 5xx responses).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { transient: true, .. })
    }
}

/// How a `put` landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Written to the configured backend.
    Written,
    /// The configured backend failed and the object was written to local
    /// disk instead.
    DegradedToLocal { reason: String },
}

impl PutOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::DegradedToLocal { .. })
    }
}

/// Object timestamps reported by the medium, when it has them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectTimes {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Capability set shared by all storage backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short label for health reporting ("local", "s3", "memory").
    fn describe(&self) -> &'static str;

    /// Read an object. Fails with `NotFound` when the key does not exist.
    async fn get(&self, key: &str) -> BackendResult<Vec<u8>>;

    /// Overwrite an object.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BackendResult<PutOutcome>;

    /// Snapshot of keys starting with `prefix`.
    async fn list(&self, prefix: &str) -> BackendResult<Vec<String>>;

    /// Object timestamps, if the medium can report them.
    async fn stat(&self, _key: &str) -> BackendResult<Option<ObjectTimes>> {
        Ok(None)
    }

    /// Keys whose latest write only reached a fallback medium.
    fn degraded_keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Which backend to build, decided once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Files under a local directory.
    Local { root: PathBuf },
    /// Objects in an S3 bucket, optionally falling back to a local
    /// directory when a write fails transiently.
    S3 {
        bucket: String,
        local_fallback: Option<PathBuf>,
    },
    /// In-process map; nothing survives a restart.
    Memory,
}

/// Build the backend described by `config`.
pub async fn connect(config: &StorageConfig) -> crate::Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::Local { root } => Ok(Arc::new(LocalBackend::new(root.clone()))),
        StorageConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
        #[cfg(feature = "s3")]
        StorageConfig::S3 {
            bucket,
            local_fallback,
        } => {
            if bucket.is_empty() {
                return Err(crate::Error::Config(
                    "S3 storage requires a bucket name".into(),
                ));
            }
            let primary: Arc<dyn StorageBackend> = Arc::new(S3Backend::from_env(bucket).await);
            Ok(match local_fallback {
                Some(root) => Arc::new(FallbackBackend::new(primary, LocalBackend::new(root.clone()))),
                None => primary,
            })
        }
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3 { .. } => Err(crate::Error::Config(
            "S3 storage requires the `s3` feature".into(),
        )),
    }
}
