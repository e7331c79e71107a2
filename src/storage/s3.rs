use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config;

use super::{ObjectStorage, StorageError};

/// S3-compatible backend (MinIO in development, AWS in deployment).
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    auto_create: bool,
    // One-time bucket check; concurrent first callers coalesce on the cell.
    bucket_ready: OnceCell<()>,
}

impl S3Storage {
    /// Build the client from the active config. Uses path-style addressing so
    /// MinIO-style endpoints resolve without virtual-host DNS.
    pub async fn from_config() -> Self {
        let storage = &config::config().storage;

        let region_provider =
            RegionProviderChain::first_try(aws_sdk_s3::config::Region::new(storage.region.clone()))
                .or_default_provider();
        let aws_config = aws_config::from_env().region(region_provider).load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config).force_path_style(true);
        if !storage.endpoint.is_empty() {
            builder = builder.endpoint_url(&storage.endpoint);
        }

        let client = S3Client::from_conf(builder.build());
        info!(
            "Object storage configured: bucket='{}', endpoint='{}'",
            storage.bucket,
            if storage.endpoint.is_empty() { "<default>" } else { &storage.endpoint }
        );

        Self {
            client,
            bucket: storage.bucket.clone(),
            auto_create: storage.auto_create_bucket,
            bucket_ready: OnceCell::new(),
        }
    }

    pub fn new(client: S3Client, bucket: String, auto_create: bool) -> Self {
        Self {
            client,
            bucket,
            auto_create,
            bucket_ready: OnceCell::new(),
        }
    }

    /// Idempotent remote setup, performed at most once per process lifetime.
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.bucket_ready
            .get_or_try_init(|| async {
                let exists = self
                    .client
                    .head_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .is_ok();

                if !exists {
                    if !self.auto_create {
                        return Err(StorageError::BucketSetup(format!(
                            "bucket '{}' does not exist and auto-create is disabled",
                            self.bucket
                        )));
                    }
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| StorageError::BucketSetup(e.to_string()))?;
                    info!("Created storage bucket '{}'", self.bucket);
                }

                Ok(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.ensure_bucket().await?;
        debug!("Uploading object: key='{}', size={} bytes", key, content.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(content.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::PutFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_bucket().await?;
        debug!("Deleting object: key='{}'", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }
}
