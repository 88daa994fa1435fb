use crate::error::{Result, ServerError};
use chameleon_cache::{
    AwsCliTransport, BlobStore, LocalBlobStore, StagedBlobStore, DEFAULT_BUCKET, DEFAULT_ENDPOINT,
};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Which blob store backs the data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStoreKind {
    /// Stage locally, keep the bytes in the object store
    Staged,
    Local,
}

impl FromStr for BlobStoreKind {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staged" | "s3" => Ok(BlobStoreKind::Staged),
            "local" | "disk" => Ok(BlobStoreKind::Local),
            other => Err(ServerError::Config(format!(
                "unknown BLOB_STORE '{}', expected 'staged' or 'local'",
                other
            ))),
        }
    }
}

/// Server configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub blob_store: BlobStoreKind,
    pub s3_endpoint: String,
    pub s3_bucket: String,
    pub aws_cli: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6005,
            data_dir: PathBuf::from("./data"),
            blob_store: BlobStoreKind::Staged,
            s3_endpoint: DEFAULT_ENDPOINT.to_string(),
            s3_bucket: DEFAULT_BUCKET.to_string(),
            aws_cli: "aws".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| ServerError::Config(format!("invalid PORT '{}': {}", p, e)))?,
            None => defaults.port,
        };

        let blob_store = match lookup("BLOB_STORE") {
            Some(kind) => kind.parse()?,
            None => defaults.blob_store,
        };

        Ok(Self {
            port,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            blob_store,
            s3_endpoint: lookup("S3_ENDPOINT").unwrap_or(defaults.s3_endpoint),
            s3_bucket: lookup("S3_BUCKET").unwrap_or(defaults.s3_bucket),
            aws_cli: lookup("AWS_CLI").unwrap_or(defaults.aws_cli),
        })
    }

    pub fn build_store(&self) -> Arc<dyn BlobStore> {
        match self.blob_store {
            BlobStoreKind::Local => Arc::new(LocalBlobStore::new()),
            BlobStoreKind::Staged => {
                let transport = AwsCliTransport::new(&self.aws_cli, &self.s3_endpoint);
                Arc::new(StagedBlobStore::new(&self.s3_bucket, Arc::new(transport)))
            }
        }
    }
}
