//! Error types module
//!
//! Every failure the processing pipeline can run into is a [`PipelineError`].
//! None of them escape the orchestrator: each is folded into a
//! `ProcessingResult { success: false, .. }` carrying the display message and the
//! stable [`PipelineError::error_code`].

use crate::validation::PathValidationError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for tool and local filesystem failures
    Warn,
    /// Error level - for storage failures
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid path parameters: {0}")]
    InvalidPathParameters(String),

    #[error("Invalid characters in file path: {0}")]
    UnsafePathCharacters(String),

    #[error("Path escapes root directory: {0}")]
    PathEscapesRoot(String),

    #[error("Unsupported file format '{extension}'. Use: {accepted}")]
    UnsupportedFormat { extension: String, accepted: String },

    #[error("Temp directory unavailable: {0}")]
    TempDirUnavailable(String),

    #[error("Frame extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("No frames were extracted from the video")]
    NoFramesProduced,

    #[error("Archive build failed: {0}")]
    ArchiveBuildFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl PipelineError {
    /// Machine-readable error code (e.g., "INVALID_PATH_PARAMETERS")
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::InvalidPathParameters(_) => "INVALID_PATH_PARAMETERS",
            PipelineError::UnsafePathCharacters(_) => "UNSAFE_PATH_CHARACTERS",
            PipelineError::PathEscapesRoot(_) => "PATH_ESCAPES_ROOT",
            PipelineError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            PipelineError::TempDirUnavailable(_) => "TEMP_DIR_UNAVAILABLE",
            PipelineError::ExtractionFailed(_) => "EXTRACTION_FAILED",
            PipelineError::NoFramesProduced => "NO_FRAMES_PRODUCED",
            PipelineError::ArchiveBuildFailed(_) => "ARCHIVE_BUILD_FAILED",
            PipelineError::UploadFailed(_) => "UPLOAD_FAILED",
            PipelineError::DownloadFailed(_) => "DOWNLOAD_FAILED",
            PipelineError::DeleteFailed(_) => "DELETE_FAILED",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Whether the caller supplied the bad input (as opposed to a runtime failure).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidPathParameters(_)
                | PipelineError::UnsafePathCharacters(_)
                | PipelineError::PathEscapesRoot(_)
                | PipelineError::UnsupportedFormat { .. }
                | PipelineError::NotFound(_)
        )
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            e if e.is_caller_error() => LogLevel::Debug,
            PipelineError::TempDirUnavailable(_)
            | PipelineError::ExtractionFailed(_)
            | PipelineError::NoFramesProduced
            | PipelineError::ArchiveBuildFailed(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Emit this error through `tracing` at its own log level.
    pub fn log(&self, stage: &str) {
        match self.log_level() {
            LogLevel::Debug => {
                tracing::debug!(stage, error_code = self.error_code(), error = %self, "Pipeline rejected input")
            }
            LogLevel::Warn => {
                tracing::warn!(stage, error_code = self.error_code(), error = %self, "Pipeline stage failed")
            }
            LogLevel::Error => {
                tracing::error!(stage, error_code = self.error_code(), error = %self, "Pipeline stage failed")
            }
        }
    }
}

impl From<PathValidationError> for PipelineError {
    fn from(err: PathValidationError) -> Self {
        let message = err.to_string();
        match err {
            PathValidationError::InvalidPathParameters => {
                PipelineError::InvalidPathParameters(message)
            }
            PathValidationError::UnsafePathCharacters { .. } => {
                PipelineError::UnsafePathCharacters(message)
            }
            PathValidationError::PathEscapesRoot { .. } => PipelineError::PathEscapesRoot(message),
        }
    }
}
