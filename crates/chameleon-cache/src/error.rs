//! Error types for the response cache

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum CacheError {
    Io {
        path: PathBuf,
        source: Box<std::io::Error>,
    },
    NotFound(PathBuf),
    Remote(String),
    CorruptIndex {
        path: PathBuf,
        message: String,
    },
    Serialize(String),
}

impl CacheError {
    /// Wrap an I/O error with the path it occurred on, folding
    /// `ErrorKind::NotFound` into [`CacheError::NotFound`].
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return CacheError::NotFound(path.to_path_buf());
        }
        CacheError::Io {
            path: path.to_path_buf(),
            source: Box::new(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
            CacheError::NotFound(path) => write!(f, "Blob not found: {}", path.display()),
            CacheError::Remote(msg) => write!(f, "Remote store error: {}", msg),
            CacheError::CorruptIndex { path, message } => {
                write!(f, "Corrupt spec index {}: {}", path.display(), message)
            }
            CacheError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
