use framegrinder_core::JobTimestamp;
use std::fmt;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// An inbound video: a byte stream plus the filename the client declared for it.
pub struct ProcessingRequest {
    pub source: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    pub declared_filename: String,
    pub job_timestamp: JobTimestamp,
}

impl ProcessingRequest {
    /// New request with a freshly generated job timestamp.
    pub fn new(
        source: Pin<Box<dyn AsyncRead + Send + Unpin>>,
        declared_filename: impl Into<String>,
    ) -> Self {
        Self {
            source,
            declared_filename: declared_filename.into(),
            job_timestamp: JobTimestamp::now(),
        }
    }

    pub fn with_job_timestamp(mut self, job_timestamp: JobTimestamp) -> Self {
        self.job_timestamp = job_timestamp;
        self
    }

    /// Request reading from a local file, declared under its own file name.
    pub async fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let declared = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(Box::pin(file), declared))
    }
}

impl fmt::Debug for ProcessingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingRequest")
            .field("declared_filename", &self.declared_filename)
            .field("job_timestamp", &self.job_timestamp)
            .finish_non_exhaustive()
    }
}
