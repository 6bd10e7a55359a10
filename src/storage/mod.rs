//! Object storage for post attachments.

mod bucket;
mod local;

pub use bucket::S3Store;
pub use local::{LocalStore, LOCAL_URL_PREFIX};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::config::{Config, StorageBackend};
use crate::error::StorageError;

/// Where attachment bytes live.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// URL clients use to download the object.
    fn public_url(&self, key: &str) -> String;

    /// Remove the object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Build the store selected by configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be initialized.
pub async fn from_config(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        StorageBackend::Local => Ok(Arc::new(LocalStore::new(&config.upload_dir).await?)),
        StorageBackend::S3 => Ok(Arc::new(S3Store::new(config)?)),
    }
}

/// Generate a unique object key: `{prefix}{millis}-{random}.{ext}`.
///
/// The extension comes from the uploaded file name; files without one get `bin`.
#[must_use]
pub fn generate_object_key(prefix: &str, file_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| "bin".to_string(), str::to_lowercase);

    format!("{prefix}{millis}-{random}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_object_key() {
        let key = generate_object_key("post-attachments/", "Lecture Notes.PDF");
        assert!(key.starts_with("post-attachments/"));
        assert!(key.ends_with(".pdf"));

        let name = key.trim_start_matches("post-attachments/");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(rest.len(), 12 + ".pdf".len());
    }

    #[test]
    fn test_generate_object_key_without_extension() {
        assert!(generate_object_key("", "README").ends_with(".bin"));
        assert!(generate_object_key("", "../../etc/passwd").ends_with(".bin"));
        assert_ne!(generate_object_key("", "a.txt"), generate_object_key("", "a.txt"));
    }
}
