//! MinIO/S3-compatible storage client
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use crate::core::config::MinIOConfig;
use crate::core::error::AppError;
use crate::modules::storage::BlobStorage;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    presigned_url_expiry_secs: u32,
    endpoint: String,
    attachment_prefix: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration, creating the bucket if
    /// it doesn't exist
    pub async fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            presigned_url_expiry_secs: config.presigned_url_expiry_secs,
            endpoint: config.endpoint,
            attachment_prefix: config.attachment_prefix,
        };

        client.ensure_bucket_exists().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.attachment_prefix
        );

        Ok(client)
    }

    /// Create the bucket; an existing bucket is not an error
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Object key for a blob name, e.g. "attachments/3f2a....pdf"
    pub fn object_key(&self, name: &str) -> String {
        object_key(&self.attachment_prefix, name)
    }
}

fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[async_trait]
impl BlobStorage for MinIOClient {
    async fn upload(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<bool, AppError> {
        let key = self.object_key(name);

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, content_type)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to upload file '{}': {}", key, e))
            })?;

        let stored = (200..300).contains(&response.status_code());
        if stored {
            debug!("Uploaded file '{}' to bucket '{}'", key, self.bucket.name());
        } else {
            warn!(
                "Upload of '{}' returned status {}",
                key,
                response.status_code()
            );
        }

        Ok(stored)
    }

    async fn signed_url(&self, name: &str) -> Result<String, AppError> {
        let key = self.object_key(name);

        self.bucket
            .presign_get(&key, self.presigned_url_expiry_secs, None)
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!(
                    "Failed to generate presigned URL for '{}': {}",
                    key, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_joins_prefix() {
        assert_eq!(object_key("attachments", "a.pdf"), "attachments/a.pdf");
        assert_eq!(object_key("/attachments/", "a.pdf"), "attachments/a.pdf");
        assert_eq!(object_key("", "a.pdf"), "a.pdf");
    }
}
