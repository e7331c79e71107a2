pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

pub use s3::S3Storage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage write failed for key '{key}': {reason}")]
    PutFailed { key: String, reason: String },

    #[error("Storage delete failed for key '{key}': {reason}")]
    DeleteFailed { key: String, reason: String },

    #[error("Storage bucket setup failed: {0}")]
    BucketSetup(String),
}

/// Durable blob store seam. Implementations own nothing about key layout;
/// key derivation belongs to the pipeline, see [`build_object_key`].
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Derive the object key for a document: `documents/<uuid>` or
/// `documents/<uuid>.<ext>` with the extension stripped of all
/// non-alphanumerics and lowercased.
pub fn build_object_key(public_id: &str, extension: &str) -> String {
    let safe_ext: String = extension.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if safe_ext.is_empty() {
        format!("documents/{}", public_id)
    } else {
        format!("documents/{}.{}", public_id, safe_ext.to_lowercase())
    }
}
