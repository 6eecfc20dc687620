#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use framegrinder_core::Config;
use std::path::Path;
use std::sync::Arc;

/// Create the storage backend that holds finished archives
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    build(config, &config.outputs_dir, &config.s3.outputs_bucket).await
}

/// Create the storage backend that holds uploaded source videos
pub async fn create_upload_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    build(config, &config.uploads_dir, &config.s3.uploads_bucket).await
}

#[cfg_attr(not(feature = "storage-local"), allow(unused_variables))]
#[cfg_attr(not(feature = "storage-s3"), allow(unused_variables))]
async fn build(config: &Config, dir: &Path, bucket: &str) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            if bucket.trim().is_empty() {
                return Err(StorageError::ConfigError(
                    "S3 bucket not configured".to_string(),
                ));
            }
            if config.s3.region.trim().is_empty() {
                return Err(StorageError::ConfigError(
                    "S3_REGION or AWS_REGION not configured".to_string(),
                ));
            }

            let storage = S3Storage::new(
                bucket.to_string(),
                config.s3.region.clone(),
                config.s3.endpoint.clone(),
                config.s3.external_url.clone(),
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(dir, config.download_path_prefix.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
