//! Object store - filesystem-backed buckets with public URLs

use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::error::{Result, StoreError};

/// Object store rooted at a directory; each bucket is a subdirectory
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl ObjectStore {
    /// Create an object store under `root`, serving objects from `public_base_url`
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Write `bytes` to `bucket/path`, replacing any existing object
    pub async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        info!(
            "Uploaded {} bytes to {}/{} ({})",
            bytes.len(),
            bucket,
            path,
            target.display()
        );
        Ok(())
    }

    /// Read an object back
    pub async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let target = self.object_path(bucket, path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("object {}/{}", bucket, path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Public URL for `bucket/path`. Does not check that the object exists.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        check_relative(bucket)?;
        check_relative(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

fn check_relative(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidPath("empty path".to_string()));
    }
    let safe = Path::new(value)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(StoreError::InvalidPath(value.to_string()));
    }
    Ok(())
}
