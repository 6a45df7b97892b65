//! Storage module for comment attachments
//!
//! `BlobStorage` is the seam the comment service depends on; `MinIOClient`
//! implements it against MinIO or any S3-compatible service.

mod blob_storage;
mod minio_client;

pub use blob_storage::BlobStorage;
pub use minio_client::MinIOClient;
