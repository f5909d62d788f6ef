//! services/api/src/adapters/blob.rs
//!
//! A `BlobStorage` implementation that keeps objects on the local filesystem,
//! one directory per bucket.

use async_trait::async_trait;
use bytes::Bytes;
use retirement_core::ports::{BlobStorage, PortError, PortResult, UploadOptions};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Clone)]
pub struct FsBlobAdapter {
    root: PathBuf,
}

impl FsBlobAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `bucket/path` under the root, refusing anything that could escape it.
    fn resolve(&self, bucket: &str, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(bucket).join(path.trim_end_matches('/'));
        let is_safe = !bucket.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            return Err(PortError::Unexpected(format!("Invalid object path '{}/{}'", bucket, path)));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(e: std::io::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

#[async_trait]
impl BlobStorage for FsBlobAdapter {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> PortResult<String> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let mut open = tokio::fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }
        let mut file = open.open(&target).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => PortError::Conflict(format!("{} already exists", path)),
            _ => io_error(e),
        })?;
        file.write_all(&data).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)?;

        debug!(
            "Stored {} bytes at {}/{} (cache-control max-age={})",
            data.len(),
            bucket,
            path,
            options.cache_control
        );
        Ok(path.to_string())
    }

    /// Only whole directories are removed: `prefix` names a folder such as `"<user id>/"`.
    async fn remove_prefix(&self, bucket: &str, prefix: &str) -> PortResult<()> {
        let target = self.resolve(bucket, prefix)?;
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}
