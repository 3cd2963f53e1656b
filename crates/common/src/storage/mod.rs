//! Blob storage for uploaded record images
//!
//! Paths are relative to the store root (`records/{id}/{file}`). Absolute
//! paths and `..` components are refused.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Directory holding a record's images, relative to the store root
pub fn record_dir(record_id: i32) -> String {
    format!("records/{}", record_id)
}

/// Store-by-path / read-by-path / delete-by-path
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Returns `false` when nothing was stored at `path`
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Remove a directory only if it is empty.
    ///
    /// A missing or non-empty directory is not an error; returns whether
    /// the directory was removed.
    async fn remove_dir_if_empty(&self, path: &str) -> Result<bool>;
}

/// Filesystem-backed store
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe || path.is_empty() {
            return Err(AppError::Storage {
                message: format!("Refusing path outside the upload root: {}", path),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::not_found("file", path)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_dir_if_empty(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_dir(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                // Non-empty directory; the error kind varies by platform
                tracing::debug!(path, error = %e, "Keeping record directory");
                Ok(false)
            }
        }
    }
}
