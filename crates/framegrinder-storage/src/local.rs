use crate::keys::validate_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use framegrinder_core::validation::validate_within_root;
use framegrinder_core::{DownloadLocation, StorageObject};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    download_path_prefix: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (the outputs directory)
    /// * `download_path_prefix` - API path serving stored files (e.g. "/api/v1/videos")
    pub async fn new(
        base_path: impl Into<PathBuf>,
        download_path_prefix: impl Into<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            download_path_prefix: download_path_prefix.into(),
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// The key must pass the shared key rules, the joined path must stay under the
    /// base directory lexically, and if it already exists its canonical form must
    /// too (a symlink inside the root cannot point outside it).
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);
        validate_within_root(&path, &self.base_path).map_err(|e| {
            StorageError::InvalidKey(format!("Storage key resolves outside storage directory: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if !canonical.starts_with(&base_canonical) {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// API path that serves a stored file
    fn generate_download_path(&self, key: &str) -> String {
        format!(
            "{}/{}/download",
            self.download_path_prefix.trim_end_matches('/'),
            urlencoding::encode(key)
        )
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> StorageResult<()> {
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Ok(relative) = path.strip_prefix(&self.base_path) {
                        let key = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/");
                        keys.push(key);
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Bytes, _content_type: Option<&str>) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn put_stream(
        &self,
        key: &str,
        _content_type: Option<&str>,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream put successful"
        );

        Ok(bytes_copied)
    }

    async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = key.to_string();
        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream read error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        self.collect_keys(&self.base_path, &mut keys).await?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn stat(&self, key: &str) -> StorageResult<StorageObject> {
        let path = self.key_to_path(key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        };
        let last_modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(StorageObject {
            bucket_or_root: self.base_path.display().to_string(),
            key: key.to_string(),
            size: meta.len(),
            last_modified,
        })
    }

    async fn presign(&self, key: &str, _expires_in: Duration) -> StorageResult<DownloadLocation> {
        if !self.exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(DownloadLocation::ApiPath(self.generate_download_path(key)))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
