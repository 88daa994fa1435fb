//! Blob store that stages bytes locally and keeps them in an object store
//!
//! Writes land in a local staging file, get copied to
//! `s3://<bucket><local path>` and the staging file is removed. Reads run the
//! same steps in reverse.

use crate::error::{CacheError, Result};
use crate::store::{write_local, BlobStore};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:9000/";
pub const DEFAULT_BUCKET: &str = "mybucket";

/// Copies files between the local filesystem and a remote object store
#[async_trait]
pub trait ObjectTransport: Send + Sync {
    async fn upload(&self, local: &Path, remote: &str) -> Result<()>;
    async fn download(&self, remote: &str, local: &Path) -> Result<()>;
}

/// Shells out to the `aws s3 cp` command line client
#[derive(Debug, Clone)]
pub struct AwsCliTransport {
    program: String,
    endpoint: String,
}

impl AwsCliTransport {
    pub fn new(program: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            endpoint: endpoint.into(),
        }
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        debug!(program = %self.program, endpoint = %self.endpoint, src, dst, "Running object store copy");

        let output = Command::new(&self.program)
            .arg("s3")
            .arg(format!("--endpoint={}", self.endpoint))
            .arg("cp")
            .arg(src)
            .arg(dst)
            .output()
            .await
            .map_err(|e| CacheError::Remote(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CacheError::Remote(format!(
                "{} cp {} {} exited with {}: {}",
                self.program,
                src,
                dst,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Default for AwsCliTransport {
    fn default() -> Self {
        Self::new("aws", DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl ObjectTransport for AwsCliTransport {
    async fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        self.copy(&local.to_string_lossy(), remote).await
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        self.copy(remote, &local.to_string_lossy()).await
    }
}

pub struct StagedBlobStore {
    bucket: String,
    transport: Arc<dyn ObjectTransport>,
}

impl StagedBlobStore {
    pub fn new(bucket: impl Into<String>, transport: Arc<dyn ObjectTransport>) -> Self {
        Self {
            bucket: bucket.into(),
            transport,
        }
    }

    /// Remote URI for a local path: the bucket prefixed to the absolute path.
    pub fn remote_uri(&self, path: &Path) -> String {
        format!("s3://{}{}", self.bucket, path.display())
    }
}

impl Default for StagedBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET, Arc::new(AwsCliTransport::default()))
    }
}

async fn remove_staging_copy(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .await
        .map_err(|e| CacheError::io(path, e))
}

#[async_trait]
impl BlobStore for StagedBlobStore {
    async fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        write_local(path, content).await?;

        let remote = self.remote_uri(path);
        let uploaded = self.transport.upload(path, &remote).await;

        match (uploaded, remove_staging_copy(path).await) {
            (Ok(()), Ok(())) => {
                debug!(remote = %remote, size = content.len(), "Uploaded blob");
                Ok(())
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    warn!(path = %path.display(), error = %cleanup_err, "Failed to remove staging copy");
                }
                Err(e)
            }
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let remote = self.remote_uri(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }
        if let Err(e) = self.transport.download(&remote, path).await {
            // Nothing was staged: report the object as missing
            if !fs::try_exists(path).await.unwrap_or(false) {
                debug!(remote = %remote, error = %e, "Remote object unavailable");
                return Err(CacheError::NotFound(path.to_path_buf()));
            }
            return Err(e);
        }

        let data = fs::read(path).await.map_err(|e| CacheError::io(path, e))?;
        if let Err(e) = remove_staging_copy(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove staging copy");
        }

        debug!(remote = %remote, size = data.len(), "Downloaded blob");
        Ok(data)
    }
}
