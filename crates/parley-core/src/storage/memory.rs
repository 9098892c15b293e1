//! In-process backend.
//!
//! Keeps objects in a map behind a lock. Used by tests and by ephemeral runs
//! where nothing needs to survive a restart.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{BackendError, BackendResult, PutOutcome, StorageBackend};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Objects held in memory, keyed by storage key.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded by the last `put` for `key`.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(key)
            .map(|object| object.content_type.clone())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn describe(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> BackendResult<Vec<u8>> {
        let objects = self.objects.read().map_err(|_| BackendError::LockPoisoned)?;
        objects
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| BackendError::NotFound {
                key: key.to_string(),
            })
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BackendResult<PutOutcome> {
        let mut objects = self.objects.write().map_err(|_| BackendError::LockPoisoned)?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(PutOutcome::Written)
    }

    async fn list(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let objects = self.objects.read().map_err(|_| BackendError::LockPoisoned)?;
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
