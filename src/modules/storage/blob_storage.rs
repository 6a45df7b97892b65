use async_trait::async_trait;

use crate::core::error::AppError;

/// Object store for comment attachments
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `name`. Returns `false` when the store accepted the
    /// request but did not persist the object.
    async fn upload(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<bool, AppError>;

    /// Time-limited download URL for `name`
    async fn signed_url(&self, name: &str) -> Result<String, AppError>;
}
