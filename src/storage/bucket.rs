use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use super::ObjectStore;
use crate::config::Config;
use crate::error::StorageError;

/// Attachment store backed by an S3-compatible bucket.
#[derive(Clone)]
pub struct S3Store {
    bucket: Box<Bucket>,
    endpoint: Option<String>,
}

impl S3Store {
    /// Create a store from configuration.
    ///
    /// Credentials come from `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the bucket is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        let bucket_name = config.s3_bucket.as_deref().context("S3_BUCKET not set")?;
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").context("AWS_ACCESS_KEY_ID not set")?;
        let secret_key =
            std::env::var("AWS_SECRET_ACCESS_KEY").context("AWS_SECRET_ACCESS_KEY not set")?;

        let credentials = Credentials::new(Some(&access_key), Some(&secret_key), None, None, None)
            .context("Failed to create S3 credentials")?;

        let region = if let Some(ref endpoint) = config.s3_endpoint {
            Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            }
        } else {
            config.s3_region.parse().unwrap_or(Region::UsEast1)
        };

        let bucket =
            Bucket::new(bucket_name, region, credentials).context("Failed to create S3 bucket")?;

        // Use path-style for custom endpoints (MinIO, R2, etc.)
        let bucket = if config.s3_endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            endpoint: config.s3_endpoint.clone(),
        })
    }
}

/// Map an HTTP status from the bucket onto a storage error kind.
fn classify_status(code: u16, body: &str) -> StorageError {
    match code {
        413 => StorageError::PolicyDenied(format!("object too large for bucket: {body}")),
        401 | 403 => StorageError::PolicyDenied(format!("access denied ({code})")),
        _ => StorageError::Backend(anyhow!("S3 returned status {code}: {body}")),
    }
}

fn classify_error(err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(code, body) => classify_status(code, &body),
        other => StorageError::Backend(anyhow!("S3 request failed: {other}")),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        debug!(key = %key, content_type = %content_type, bytes = data.len(), "Uploading object to S3");

        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(classify_error)?;

        let code = response.status_code();
        if (200..300).contains(&code) {
            Ok(())
        } else {
            Err(classify_status(
                code,
                &String::from_utf8_lossy(response.as_slice()),
            ))
        }
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{key}",
                endpoint.trim_end_matches('/'),
                self.bucket.name()
            ),
            None => format!("https://{}.s3.amazonaws.com/{key}", self.bucket.name()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        debug!(key = %key, "Deleting S3 object");

        match self.bucket.delete_object(key).await {
            Ok(_) | Err(S3Error::HttpFailWithBody(404, _)) => Ok(()),
            Err(e) => Err(classify_error(e)),
        }
    }
}
