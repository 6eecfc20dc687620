//! Storage abstraction trait
//!
//! This module defines the Storage trait that both backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use framegrinder_core::{DownloadLocation, PipelineError, StorageObject};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked object body returned by [`Storage::get`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::UploadFailed(_) | StorageError::InvalidUrl(_) => {
                PipelineError::UploadFailed(message)
            }
            StorageError::DownloadFailed(_) => PipelineError::DownloadFailed(message),
            StorageError::DeleteFailed(_) => PipelineError::DeleteFailed(message),
            StorageError::NotFound(_) => PipelineError::NotFound(message),
            StorageError::InvalidKey(_) => PipelineError::InvalidPathParameters(message),
            StorageError::BackendError(_)
            | StorageError::IoError(_)
            | StorageError::ConfigError(_) => PipelineError::StorageUnavailable(message),
        }
    }
}

/// Storage abstraction trait
///
/// The orchestrator depends only on this trait; the concrete backend is chosen
/// once by [`create_storage`](crate::create_storage).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    ///
    /// When `content_type` is `None` the backend infers one from the key's extension.
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()>;

    /// Store the contents of `reader` under `key` and return the number of bytes written.
    async fn put_stream(
        &self,
        key: &str,
        content_type: Option<&str>,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64>;

    /// Open an object for reading.
    async fn get(&self, key: &str) -> StorageResult<ByteStream>;

    /// Read a whole object into memory.
    async fn get_bytes(&self, key: &str) -> StorageResult<Bytes> {
        let mut stream = self.get(key).await?;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Size and modification time of an object.
    async fn stat(&self, key: &str) -> StorageResult<StorageObject>;

    /// Location a client can download the object from for at least `expires_in`.
    async fn presign(&self, key: &str, expires_in: Duration) -> StorageResult<DownloadLocation>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
