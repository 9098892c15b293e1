//! Local filesystem backend.
//!
//! Keys map to files directly under a root directory. The namespace is flat:
//! `list` never recurses, and keys containing path separators are refused.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{BackendError, BackendResult, ObjectTimes, PutOutcome, StorageBackend};

/// Files under `<root>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BackendResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(BackendError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn describe(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> BackendResult<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| BackendError::from_io(key, e))
    }

    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> BackendResult<PutOutcome> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BackendError::io(key, e))?;

        // Each write gets its own temp file, renamed over the target. Readers
        // see one complete payload; overlapping writers race on the rename.
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(BackendError::io(key, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(BackendError::io(key, e));
        }

        debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(PutOutcome::Written)
    }

    async fn list(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackendError::from_io(prefix, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackendError::from_io(prefix, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|ft| ft.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || !name.starts_with(prefix) {
                continue;
            }
            keys.push(name);
        }

        keys.sort();
        Ok(keys)
    }

    async fn stat(&self, key: &str) -> BackendResult<Option<ObjectTimes>> {
        let path = self.path_for(key)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::from_io(key, e)),
        };

        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        // Not every filesystem records a birth time.
        let created = metadata
            .created()
            .ok()
            .map(DateTime::<Utc>::from)
            .or(modified);

        Ok(Some(ObjectTimes { created, modified }))
    }
}
