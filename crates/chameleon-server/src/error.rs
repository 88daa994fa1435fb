//! Error types for the chameleon server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum ServerError {
    BadRequest(String),
    NotFound(String),
    Cache(chameleon_cache::CacheError),
    Io(Box<std::io::Error>),
    Config(String),
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServerError::Cache(err) => write!(f, "Cache error: {}", err),
            ServerError::Io(err) => write!(f, "IO error: {}", err),
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Cache(err) => Some(err),
            ServerError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<chameleon_cache::CacheError> for ServerError {
    fn from(err: chameleon_cache::CacheError) -> Self {
        ServerError::Cache(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => {
                tracing::error!(error = %other, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cache_error_display() {
        let err = ServerError::from(chameleon_cache::CacheError::NotFound(PathBuf::from(
            "/data/req-a",
        )));
        assert_eq!(format!("{}", err), "Cache error: Blob not found: /data/req-a");
    }

    #[test]
    fn test_config_error_display() {
        let err = ServerError::Config("unknown BLOB_STORE".to_string());
        assert_eq!(format!("{}", err), "Configuration error: unknown BLOB_STORE");
    }

    #[test]
    fn test_status_mapping() {
        let bad = ServerError::BadRequest("key".to_string()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = ServerError::NotFound("key".to_string()).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let internal = ServerError::Cache(chameleon_cache::CacheError::Remote(
            "upload refused".to_string(),
        ))
        .into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
