use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use framegrinder_core::{DownloadLocation, StorageObject};
use framegrinder_storage::keys::validate_key;
use framegrinder_storage::{ByteStream, Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{BTreeMap, BTreeSet};
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the chunks `get` streams objects in.
pub const CHUNK_SIZE: usize = 4;

/// In-memory object store that behaves like the S3 backend.
///
/// With `fail_puts` every write is rejected, standing in for an unreachable bucket.
/// With `broken_reads` a download fails after its first chunk. Keys in
/// `stat_failures` are listed but cannot be inspected, as if deleted mid-listing.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_puts: bool,
    broken_reads: bool,
    stat_failures: BTreeSet<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    pub fn with_broken_reads(mut self) -> Self {
        self.broken_reads = true;
        self
    }

    pub fn with_stat_failure(mut self, key: &str) -> Self {
        self.stat_failures.insert(key.to_string());
        self
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> StorageResult<()> {
        validate_key(key)?;
        if self.fail_puts {
            return Err(StorageError::UploadFailed(
                "simulated bucket outage".to_string(),
            ));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn put_stream(
        &self,
        key: &str,
        content_type: Option<&str>,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        let size = buffer.len() as u64;
        self.put(key, Bytes::from(buffer), content_type).await?;
        Ok(size)
    }

    async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        let data = self
            .object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let mut chunks: Vec<Result<Bytes, StorageError>> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(data.len()))))
            .collect();
        if self.broken_reads {
            chunks.truncate(1);
            chunks.push(Err(StorageError::DownloadFailed(format!(
                "connection reset while reading {}",
                key
            ))));
        }
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.object(key).is_some())
    }

    async fn stat(&self, key: &str) -> StorageResult<StorageObject> {
        if self.stat_failures.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let data = self
            .object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(StorageObject {
            bucket_or_root: "memory".to_string(),
            key: key.to_string(),
            size: data.len() as u64,
            last_modified: Utc::now(),
        })
    }

    async fn presign(&self, key: &str, expires_in: Duration) -> StorageResult<DownloadLocation> {
        if self.object(key).is_none() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(DownloadLocation::Url(format!(
            "https://memory.example.com/{}?X-Amz-Expires={}",
            key,
            expires_in.as_secs()
        )))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
