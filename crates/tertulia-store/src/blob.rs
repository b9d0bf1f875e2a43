//! Attachment storage.
//!
//! The engine hands over the bytes and a random object path and gets back a
//! URL it can embed in a message.  Upload either completes with a URL or
//! fails; there is no partial result.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `path` and return a retrievable URL.
    async fn upload(&self, path: &str, data: Bytes) -> Result<String>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryBlobs {
    objects: HashMap<String, Bytes>,
    failing: bool,
}

/// Blob storage kept in memory, with a switch to make uploads fail.
#[derive(Clone, Default)]
pub struct MemoryBlobStorage {
    inner: Arc<Mutex<MemoryBlobs>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing = failing;
        }
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().map(|i| i.objects.len()).unwrap_or(0)
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.inner.lock().ok()?.objects.get(path).cloned()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, path: &str, data: Bytes) -> Result<String> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))?;
        if inner.failing {
            return Err(StoreError::Upload(format!("transfer of {path} interrupted")));
        }
        inner.objects.insert(path.to_string(), data);
        Ok(format!("mem://{path}"))
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Blob storage rooted at a local directory.  URLs are `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStorage {
    base_path: PathBuf,
    max_size: usize,
}

impl FsBlobStorage {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;
        let base_path = base_path.canonicalize()?;

        info!(path = %base_path.display(), "Blob storage initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve an object path below the base directory, refusing anything
    /// that would escape it.
    fn object_path(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.base_path.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(c) => resolved.push(c),
                Component::CurDir => {}
                _ => {
                    return Err(StoreError::Upload(format!("invalid object path: {path}")));
                }
            }
        }
        if resolved == self.base_path {
            return Err(StoreError::Upload("empty object path".to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn upload(&self, path: &str, data: Bytes) -> Result<String> {
        if data.is_empty() {
            return Err(StoreError::Upload("empty blob".to_string()));
        }
        if data.len() > self.max_size {
            return Err(StoreError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &data).await?;

        debug!(path = %target.display(), size = data.len(), "Blob stored");
        Ok(format!("file://{}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_upload_and_failure() {
        let blobs = MemoryBlobStorage::new();
        let url = blobs
            .upload("chatImages/x", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(url, "mem://chatImages/x");
        assert_eq!(blobs.get("chatImages/x").unwrap(), Bytes::from_static(b"png"));

        blobs.set_failing(true);
        assert!(blobs.upload("chatImages/y", Bytes::from_static(b"png")).await.is_err());
        assert_eq!(blobs.object_count(), 1);
    }

    #[tokio::test]
    async fn fs_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStorage::new(dir.path().join("blobs"), 1024).await.unwrap();

        let url = blobs
            .upload("chatAudios/n1", Bytes::from_static(b"webm"))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        let stored = std::fs::read(blobs.base_path().join("chatAudios/n1")).unwrap();
        assert_eq!(stored, b"webm");
    }

    #[tokio::test]
    async fn fs_rejects_traversal_and_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStorage::new(dir.path().to_path_buf(), 4).await.unwrap();

        assert!(blobs.upload("../escape", Bytes::from_static(b"x")).await.is_err());
        assert!(matches!(
            blobs.upload("big", Bytes::from_static(b"12345")).await,
            Err(StoreError::BlobTooLarge { size: 5, max: 4 })
        ));
    }
}
