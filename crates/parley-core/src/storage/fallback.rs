//! Degraded-write wrapper: remote primary, local disk as a last resort.
//!
//! A `put` that fails transiently on the primary is written to the local
//! backend and reported as [`PutOutcome::DegradedToLocal`]. Non-transient
//! failures (auth, missing bucket, bad request) are returned unchanged.
//!
//! Keys degraded by this instance are read back from local disk until a
//! later primary `put` for the same key succeeds, so an append is visible to
//! the next load even when it only reached the fallback.
//!
//! The degraded set lives in process memory. It holds at most one entry per
//! key written during an outage and shrinks as those keys are written to the
//! primary again. It is not persisted: after a restart reads go to the
//! primary, and local copies of still-degraded keys stay on disk until an
//! operator reconciles them. The current set is reported through
//! [`StorageBackend::degraded_keys`] so it can be watched from health checks.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{BackendError, BackendResult, LocalBackend, ObjectTimes, PutOutcome, StorageBackend};

/// Primary backend with a local-disk fallback for writes.
pub struct FallbackBackend {
    primary: Arc<dyn StorageBackend>,
    local: LocalBackend,
    degraded: Mutex<HashSet<String>>,
}

impl FallbackBackend {
    pub fn new(primary: Arc<dyn StorageBackend>, local: LocalBackend) -> Self {
        Self {
            primary,
            local,
            degraded: Mutex::new(HashSet::new()),
        }
    }

    fn is_degraded(&self, key: &str) -> BackendResult<bool> {
        let set = self.degraded.lock().map_err(|_| BackendError::LockPoisoned)?;
        Ok(set.contains(key))
    }

    fn mark(&self, key: &str, degraded: bool) -> BackendResult<()> {
        let mut set = self.degraded.lock().map_err(|_| BackendError::LockPoisoned)?;
        if degraded {
            set.insert(key.to_string());
        } else {
            set.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FallbackBackend {
    fn describe(&self) -> &'static str {
        self.primary.describe()
    }

    async fn get(&self, key: &str) -> BackendResult<Vec<u8>> {
        if self.is_degraded(key)? {
            return self.local.get(key).await;
        }
        self.primary.get(key).await
    }

    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BackendResult<PutOutcome> {
        match self.primary.put(key, bytes, content_type).await {
            Ok(outcome) => {
                self.mark(key, false)?;
                Ok(outcome)
            }
            Err(err) if err.is_transient() => {
                debug!("Primary write of {} failed ({}), writing locally", key, err);
                self.local.put(key, bytes, content_type).await?;
                self.mark(key, true)?;
                Ok(PutOutcome::DegradedToLocal {
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn list(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let mut keys = self.primary.list(prefix).await?;
        for key in self.degraded_keys() {
            if key.starts_with(prefix) && !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn stat(&self, key: &str) -> BackendResult<Option<ObjectTimes>> {
        if self.is_degraded(key)? {
            return self.local.stat(key).await;
        }
        self.primary.stat(key).await
    }

    /// Keys currently served from local disk, sorted.
    fn degraded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .degraded
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
