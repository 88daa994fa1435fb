//! Cache types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Control header that installs a response in memory without persisting it.
pub const SKIP_DISK_HEADER: &str = "_chameleon-seeded-skip-disk";

/// A fully materialized response held by the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status_code: u16,
    /// Header name to value; repeated headers are joined with `", "`
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// A response as observed upstream, before it is installed in the cache.
///
/// Header names keep the casing they were presented with and may carry
/// several values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl RecordedResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// Append a value for `name`, keeping any values already present.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Single-valued headers plus whether the skip-disk sentinel asked to stay
/// in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedHeaders {
    pub headers: BTreeMap<String, String>,
    pub skip_disk: bool,
}

/// Strip the skip-disk sentinel and join repeated header values.
///
/// The sentinel is matched without regard to case and is always removed; only
/// a non-empty value suppresses persistence.
pub fn collapse_headers(headers: &BTreeMap<String, Vec<String>>) -> CollapsedHeaders {
    let mut collapsed = CollapsedHeaders::default();

    for (name, values) in headers {
        if name.eq_ignore_ascii_case(SKIP_DISK_HEADER) {
            collapsed.skip_disk |= values.iter().any(|v| !v.is_empty());
            continue;
        }
        collapsed.headers.insert(name.clone(), values.join(", "));
    }

    collapsed
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Puts written through to the blob store
    pub persisted: u64,
    /// Puts kept in memory because of the skip-disk sentinel
    pub memory_only: u64,
}
