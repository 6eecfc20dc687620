//! Listing and management of finished archives in the outputs store.

use chrono::{DateTime, Utc};
use framegrinder_core::constants::ARCHIVE_EXTENSION;
use framegrinder_core::{DownloadLocation, PipelineError};
use framegrinder_storage::{ByteStream, Storage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

pub struct ArchiveCatalog {
    storage: Arc<dyn Storage>,
    presigned_timeout: Duration,
}

impl ArchiveCatalog {
    pub fn new(storage: Arc<dyn Storage>, presigned_timeout: Duration) -> Self {
        Self {
            storage,
            presigned_timeout,
        }
    }

    /// Top-level zip archives, newest first.
    ///
    /// An archive that cannot be inspected (for example, deleted since the
    /// listing) is skipped with a warning.
    pub async fn list_archives(&self) -> Result<Vec<ArchiveSummary>, PipelineError> {
        let suffix = format!(".{}", ARCHIVE_EXTENSION);
        let keys = self.storage.list("").await?;

        let mut archives = Vec::new();
        for key in keys
            .into_iter()
            .filter(|k| !k.contains('/') && k.ends_with(&suffix))
        {
            let object = match self.storage.stat(&key).await {
                Ok(object) => object,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to get archive info");
                    continue;
                }
            };
            let download_url = match self.storage.presign(&key, self.presigned_timeout).await {
                Ok(location) => Some(location.into_string()),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to generate download URL");
                    None
                }
            };
            archives.push(ArchiveSummary {
                filename: key,
                size: object.size,
                created_at: object.last_modified,
                download_url,
            });
        }

        archives.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(archives)
    }

    pub async fn delete_archive(&self, filename: &str) -> Result<(), PipelineError> {
        validate_archive_name(filename)?;
        if !self.storage.exists(filename).await? {
            return Err(PipelineError::NotFound(filename.to_string()));
        }
        self.storage.delete(filename).await?;
        tracing::info!(filename = %filename, "Archive deleted");
        Ok(())
    }

    pub async fn download_archive(&self, filename: &str) -> Result<ByteStream, PipelineError> {
        validate_archive_name(filename)?;
        Ok(self.storage.get(filename).await?)
    }

    pub async fn download_location(
        &self,
        filename: &str,
    ) -> Result<DownloadLocation, PipelineError> {
        validate_archive_name(filename)?;
        Ok(self.storage.presign(filename, self.presigned_timeout).await?)
    }
}

fn validate_archive_name(filename: &str) -> Result<(), PipelineError> {
    let suffix = format!(".{}", ARCHIVE_EXTENSION);
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
        || !filename.ends_with(&suffix)
    {
        return Err(PipelineError::InvalidPathParameters(format!(
            "Invalid archive name: {}",
            filename
        )));
    }
    Ok(())
}
