//! The `spec.json` index listing every persisted entry

use crate::error::{CacheError, Result};
use crate::store::BlobStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Persisted metadata for one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRecord {
    pub key: String,
    pub response: SpecResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecResponse {
    pub status_code: u16,
    /// Blob filename, relative to the data directory
    pub content: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Ordered list of spec records, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecIndex {
    records: Vec<SpecRecord>,
}

impl SpecIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an index document. Blank content is an empty index.
    pub fn parse(content: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        serde_json::from_slice(content)
    }

    /// Load the index through `store`.
    ///
    /// Any read failure means there is no index yet. Content that fails to
    /// parse is an error: a corrupt index is never silently replaced.
    pub async fn load(store: &dyn BlobStore, path: &Path) -> Result<Self> {
        let content = match store.read(path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No readable spec index, starting empty");
                b"[]".to_vec()
            }
        };

        Self::parse(&content).map_err(|e| CacheError::CorruptIndex {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Serialize as a JSON array indented with four spaces.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.records.serialize(&mut serializer)?;
        Ok(buf)
    }

    /// Replace the record with the same key in place, or append it.
    pub fn upsert(&mut self, record: SpecRecord) {
        match self.records.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn records(&self) -> &[SpecRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<SpecRecord>> for SpecIndex {
    fn from(records: Vec<SpecRecord>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    fn record(key: &str, status_code: u16) -> SpecRecord {
        SpecRecord {
            key: key.to_string(),
            response: SpecResponse {
                status_code,
                content: key.to_string(),
                headers: BTreeMap::from([("Content-Type".to_string(), "text/plain".to_string())]),
            },
        }
    }

    #[test]
    fn test_document_shape() {
        let index = SpecIndex::from(vec![record("req-a", 200)]);
        let json = String::from_utf8(index.to_json().unwrap()).unwrap();

        let expected = r#"[
    {
        "key": "req-a",
        "response": {
            "status_code": 200,
            "content": "req-a",
            "headers": {
                "Content-Type": "text/plain"
            }
        }
    }
]"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_empty_index_serializes_as_empty_array() {
        assert_eq!(SpecIndex::new().to_json().unwrap(), b"[]");
    }

    #[test]
    fn test_parse_accepts_any_whitespace_and_field_order() {
        let json = br#"[{"response":{"headers":{},"content":"k","status_code":204},"key":"k"}]"#;
        let index = SpecIndex::parse(json).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.records()[0].response.status_code, 204);
        assert!(index.records()[0].response.headers.is_empty());
    }

    #[test]
    fn test_parse_missing_headers_defaults_empty() {
        let json = br#"[{"key":"k","response":{"status_code":200,"content":"k"}}]"#;
        let index = SpecIndex::parse(json).unwrap();
        assert!(index.records()[0].response.headers.is_empty());
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert!(SpecIndex::parse(b"").unwrap().is_empty());
        assert!(SpecIndex::parse(b" \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(SpecIndex::parse(b"not json at all").is_err());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut index = SpecIndex::new();
        index.upsert(record("a", 200));
        index.upsert(record("b", 200));
        index.upsert(record("a", 500));

        let keys: Vec<_> = index.records().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(index.records()[0].response.status_code, 500);
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let store = MemoryBlobStore::new();
        let index = SpecIndex::load(&store, Path::new("/data/spec.json"))
            .await
            .unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_error() {
        let store = MemoryBlobStore::new();
        let path = Path::new("/data/spec.json");
        store.write(path, b"{{{ nope").await.unwrap();

        let err = SpecIndex::load(&store, path).await.unwrap_err();
        assert!(matches!(err, CacheError::CorruptIndex { .. }));
    }

    #[tokio::test]
    async fn test_load_keeps_duplicates_in_order() {
        let store = MemoryBlobStore::new();
        let path = Path::new("/data/spec.json");
        let legacy = SpecIndex::from(vec![record("d", 200), record("d", 201)]);
        store.write(path, &legacy.to_json().unwrap()).await.unwrap();

        let index = SpecIndex::load(&store, path).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.records()[1].response.status_code, 201);
    }
}
