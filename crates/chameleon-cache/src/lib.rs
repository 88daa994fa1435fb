//! Persistent response cache for record/replay proxies
//!
//! Responses are held in memory keyed by an opaque request fingerprint and
//! persisted through a pluggable [`BlobStore`]: one `spec.json` index listing
//! every entry plus one blob file per entry body. A fresh process rebuilds
//! the whole cache with [`DiskCache::rehydrate`].

mod cache;
mod error;
mod spec;
mod staged;
mod store;
mod types;

pub use cache::{DiskCache, SPEC_FILE_NAME};
pub use error::{CacheError, Result};
pub use spec::{SpecIndex, SpecRecord, SpecResponse};
pub use staged::{
    AwsCliTransport, ObjectTransport, StagedBlobStore, DEFAULT_BUCKET, DEFAULT_ENDPOINT,
};
pub use store::{BlobStore, LocalBlobStore, MemoryBlobStore};
pub use types::{
    collapse_headers, CacheStats, CachedResponse, CollapsedHeaders, RecordedResponse,
    SKIP_DISK_HEADER,
};
