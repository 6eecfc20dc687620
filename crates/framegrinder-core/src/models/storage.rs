use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata of a persisted object, as reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageObject {
    /// Bucket name for object storage, root directory for local storage.
    pub bucket_or_root: String,
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Where a client can fetch a stored object from.
///
/// Object storage hands out a presigned URL; local storage has no URL of its own
/// and returns the API path that serves the file instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum DownloadLocation {
    Url(String),
    ApiPath(String),
}

impl DownloadLocation {
    pub fn into_string(self) -> String {
        match self {
            DownloadLocation::Url(url) => url,
            DownloadLocation::ApiPath(path) => path,
        }
    }
}
