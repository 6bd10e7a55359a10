use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::ObjectStore;
use crate::error::StorageError;

/// URL prefix the web server serves [`LocalStore`] files under.
pub const LOCAL_URL_PREFIX: &str = "/uploads";

/// Stores objects as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create the store, making sure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn new(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create upload directory: {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::PolicyDenied(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        debug!(key = %key, content_type = %content_type, bytes = data.len(), "Writing upload");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create upload subdirectory")
                .map_err(StorageError::Backend)?;
        }
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
            .map_err(StorageError::Backend)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{LOCAL_URL_PREFIX}/{key}")
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(
                anyhow::Error::new(e).context(format!("Failed to delete {}", path.display())),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        store
            .put("post-attachments/1-abc.txt", b"hello", "text/plain")
            .await
            .unwrap();
        let path = dir.path().join("post-attachments/1-abc.txt");
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(
            store.public_url("post-attachments/1-abc.txt"),
            "/uploads/post-attachments/1-abc.txt"
        );

        store.delete("post-attachments/1-abc.txt").await.unwrap();
        assert!(!path.exists());
        // Second delete is a no-op.
        store.delete("post-attachments/1-abc.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();

        let err = store.put("../outside.txt", b"x", "text/plain").await.unwrap_err();
        assert!(matches!(err, StorageError::PolicyDenied(_)));
        assert!(store.delete("/etc/passwd").await.is_err());
    }
}
