//! Blob storage capability and its local implementations

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// A byte-addressable namespace the cache persists through.
///
/// Paths are absolute. A read of a path that was never written must fail
/// with [`CacheError::NotFound`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(&self, path: &Path, content: &[u8]) -> Result<()>;
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Plain files on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalBlobStore;

impl LocalBlobStore {
    pub fn new() -> Self {
        Self
    }
}

/// Write `content` to `path`, creating missing parent directories first.
pub(crate) async fn write_local(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, e))?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| CacheError::io(path, e))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        write_local(path, content).await?;
        debug!(path = %path.display(), size = content.len(), "Wrote blob");
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let data = fs::read(path).await.map_err(|e| CacheError::io(path, e))?;
        debug!(path = %path.display(), size = data.len(), "Read blob");
        Ok(data)
    }
}

/// Blob store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.blobs().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.blobs().insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.blobs()
            .get(path)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_write_and_read() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new();
        let path = dir.path().join("blob");

        store.write(&path, b"hello").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_local_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new();
        let path = dir.path().join("nested").join("data").join("blob");

        store.write(&path, b"x").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_local_empty_write_creates_empty_object() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new();
        let path = dir.path().join("empty");

        store.write(&path, b"").await.unwrap();
        assert!(store.read(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_overwrite() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new();
        let path = dir.path().join("blob");

        store.write(&path, b"first").await.unwrap();
        store.write(&path, b"second").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_local_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalBlobStore::new();

        let err = store.read(&dir.path().join("nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryBlobStore::new();
        let path = Path::new("/data/req-a");
        assert!(store.is_empty());

        store.write(path, b"abc").await.unwrap();
        assert!(store.contains(path));
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(path).await.unwrap(), b"abc");

        let err = store.read(Path::new("/data/other")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
