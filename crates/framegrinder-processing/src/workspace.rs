//! Request-scoped scratch directory for extracted frames.

use framegrinder_core::validation::{absolute_normalized, validate_job_timestamp};
use framegrinder_core::{JobTimestamp, PipelineError};
use std::path::{Path, PathBuf};

/// Directory `<temp_dir>/<job timestamp>` owned by one job.
///
/// Removed by [`Workspace::release`], or on drop if release was never reached.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create the workspace directory (and its parents) with owner-only permissions.
    ///
    /// Fails with `TempDirUnavailable` if anything already exists at the job's path.
    pub async fn acquire(base_dir: &Path, timestamp: &JobTimestamp) -> Result<Self, PipelineError> {
        validate_job_timestamp(timestamp.as_str())?;

        let path = absolute_normalized(&base_dir.join(timestamp.as_str())).ok_or_else(|| {
            PipelineError::TempDirUnavailable(format!(
                "Cannot resolve workspace under {}",
                base_dir.display()
            ))
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PipelineError::TempDirUnavailable(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // The leaf must be new: an existing entry belongs to another job.
        tokio::fs::create_dir(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                PipelineError::TempDirUnavailable(format!("{} already exists", path.display()))
            } else {
                PipelineError::TempDirUnavailable(format!(
                    "Failed to create {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))
                .await
                .map_err(|e| {
                    PipelineError::TempDirUnavailable(format!(
                        "Failed to restrict permissions on {}: {}",
                        path.display(),
                        e
                    ))
                })?;
        }

        tracing::debug!(workspace = %path.display(), "Workspace acquired");

        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace and everything in it. Failures are logged, not returned.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => tracing::debug!(workspace = %self.path.display(), "Workspace released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                workspace = %self.path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    workspace = %self.path.display(),
                    error = %e,
                    "Failed to remove workspace on drop"
                );
            }
        }
    }
}
