//! In-memory response cache persisted through a blob store

use crate::error::{CacheError, Result};
use crate::spec::{SpecIndex, SpecRecord, SpecResponse};
use crate::staged::StagedBlobStore;
use crate::store::BlobStore;
use crate::types::{collapse_headers, CacheStats, CachedResponse, CollapsedHeaders, RecordedResponse};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const SPEC_FILE_NAME: &str = "spec.json";

/// Response cache keyed by request fingerprint.
///
/// One readers/writer lock covers both the in-memory map and every write to
/// the blob store, so a `put` is atomic against other puts and readers never
/// see a half-installed entry.
pub struct DiskCache {
    entries: RwLock<HashMap<String, Arc<CachedResponse>>>,
    data_dir: PathBuf,
    spec_path: PathBuf,
    store: Arc<dyn BlobStore>,
    hits: AtomicU64,
    misses: AtomicU64,
    persisted: AtomicU64,
    memory_only: AtomicU64,
}

impl DiskCache {
    /// Create a cache over `data_dir` backed by the default staged store.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_store(data_dir, Arc::new(StagedBlobStore::default()))
    }

    /// Create a cache over `data_dir` backed by `store`.
    ///
    /// A relative `data_dir` is resolved against the working directory now,
    /// so later directory changes do not move the cache.
    pub fn with_store(data_dir: impl AsRef<Path>, store: Arc<dyn BlobStore>) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| CacheError::io(Path::new("."), e))?;
        let data_dir = cwd.join(data_dir);
        let spec_path = data_dir.join(SPEC_FILE_NAME);

        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            data_dir,
            spec_path,
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            memory_only: AtomicU64::new(0),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    /// Rebuild the in-memory map from the spec index and its blobs.
    ///
    /// Every referenced blob must be readable. On any error the map is left
    /// exactly as it was. Returns the number of entries installed.
    pub async fn rehydrate(&self) -> Result<usize> {
        let mut entries = self.entries.write().await;

        let index = SpecIndex::load(self.store.as_ref(), &self.spec_path).await?;
        let mut loaded = HashMap::with_capacity(index.len());

        for record in index.records() {
            let body = self
                .store
                .read(&self.data_dir.join(&record.response.content))
                .await?;
            let response = CachedResponse {
                status_code: record.response.status_code,
                headers: record.response.headers.clone(),
                body,
            };
            // Later records win over earlier ones with the same key
            loaded.insert(record.key.clone(), Arc::new(response));
        }

        let count = loaded.len();
        entries.extend(loaded);

        info!(
            data_dir = %self.data_dir.display(),
            records = index.len(),
            entries = count,
            "Cache rehydrated"
        );
        Ok(count)
    }

    /// Look up the cached response for `key`.
    pub async fn get(&self, key: &str) -> Option<Arc<CachedResponse>> {
        let entry = {
            let entries = self.entries.read().await;
            entries.get(key).cloned()
        };

        if entry.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache miss");
        }
        entry
    }

    /// Install `response` under `key`, persisting it unless the skip-disk
    /// sentinel is set.
    ///
    /// The key doubles as the blob filename and must be a legal single path
    /// segment.
    pub async fn put(&self, key: &str, response: RecordedResponse) -> Result<Arc<CachedResponse>> {
        let mut entries = self.entries.write().await;

        let CollapsedHeaders { headers, skip_disk } = collapse_headers(&response.headers);

        if skip_disk {
            self.memory_only.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Seeded entry kept in memory only");
        } else {
            let mut index = SpecIndex::load(self.store.as_ref(), &self.spec_path).await?;
            index.upsert(SpecRecord {
                key: key.to_string(),
                response: SpecResponse {
                    status_code: response.status_code,
                    content: key.to_string(),
                    headers: headers.clone(),
                },
            });

            self.store
                .write(&self.data_dir.join(key), &response.body)
                .await?;
            self.store.write(&self.spec_path, &index.to_json()?).await?;

            self.persisted.fetch_add(1, Ordering::Relaxed);
            debug!(
                key,
                status_code = response.status_code,
                size = response.body.len(),
                records = index.len(),
                "Persisted cache entry"
            );
        }

        let cached = Arc::new(CachedResponse {
            status_code: response.status_code,
            headers,
            body: response.body,
        });
        entries.insert(key.to_string(), Arc::clone(&cached));

        Ok(cached)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            entries: entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            memory_only: self.memory_only.load(Ordering::Relaxed),
        }
    }
}
