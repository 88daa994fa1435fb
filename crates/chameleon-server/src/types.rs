//! Request and response bodies for the chameleon server

use chameleon_cache::{CacheStats, RecordedResponse, SKIP_DISK_HEADER, SPEC_FILE_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A header given either as one value or as a list of values
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    fn into_vec(self) -> Vec<String> {
        match self {
            HeaderValues::One(value) => vec![value],
            HeaderValues::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedResponse {
    pub status_code: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: BTreeMap<String, HeaderValues>,
}

/// Body of `POST /_seed`
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRequest {
    pub key: String,
    pub response: SeedResponse,
    /// Seeded entries stay in memory unless this is set
    #[serde(default)]
    pub persist: bool,
}

impl SeedRequest {
    pub fn into_recorded(self) -> (String, RecordedResponse) {
        let mut recorded = RecordedResponse::new(self.response.status_code)
            .with_body(self.response.body.into_bytes());
        for (name, values) in self.response.headers {
            recorded.headers.insert(name, values.into_vec());
        }
        if !self.persist {
            recorded = recorded.with_header(SKIP_DISK_HEADER, "1");
        }
        (self.key, recorded)
    }
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub key: String,
    pub status_code: u16,
    pub persisted: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

/// Whether `key` can be used verbatim as a single blob filename without
/// clobbering the index document.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && key != SPEC_FILE_NAME
        && !key.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_request_deserialization() {
        let json = r#"{
            "key": "get-teapot",
            "response": {
                "status_code": 942,
                "body": "{\"key\": \"value\"}",
                "headers": {
                    "Content-Type": "application/json",
                    "Set-Cookie": ["a=1", "b=2"]
                }
            }
        }"#;

        let request: SeedRequest = serde_json::from_str(json).unwrap();
        assert!(!request.persist);
        assert_eq!(
            request.response.headers["Set-Cookie"],
            HeaderValues::Many(vec!["a=1".to_string(), "b=2".to_string()])
        );

        let (key, recorded) = request.into_recorded();
        assert_eq!(key, "get-teapot");
        assert_eq!(recorded.status_code, 942);
        assert_eq!(recorded.body, br#"{"key": "value"}"#);
        assert_eq!(recorded.headers["Content-Type"], vec!["application/json"]);
        assert_eq!(recorded.headers[SKIP_DISK_HEADER], vec!["1"]);
    }

    #[test]
    fn test_persisting_seed_has_no_sentinel() {
        let json = r#"{"key": "k", "response": {"status_code": 200}, "persist": true}"#;
        let request: SeedRequest = serde_json::from_str(json).unwrap();

        let (_, recorded) = request.into_recorded();
        assert!(!recorded.headers.contains_key(SKIP_DISK_HEADER));
        assert!(recorded.body.is_empty());
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("req-a"));
        assert!(is_valid_key("3f9a0c.json"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("."));
        assert!(!is_valid_key(".."));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("a/b"));
        assert!(!is_valid_key("a\\b"));
        assert!(!is_valid_key("spec.json"));
        assert!(is_valid_key("spec.json.bak"));
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 12,
                hits: 500,
                misses: 50,
                persisted: 10,
                memory_only: 2,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("3600"));
        assert!(json.contains("\"memory_only\":2"));
    }
}
