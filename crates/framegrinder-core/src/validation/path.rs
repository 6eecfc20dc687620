//! Path validation
//!
//! Pure checks run before any filesystem access or process execution. Each check
//! is independent; callers run every applicable one.

use std::path::{Component, Path, PathBuf};

use crate::constants::SHELL_METACHARACTERS;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathValidationError {
    #[error("invalid path parameters")]
    InvalidPathParameters,

    #[error("invalid characters in file path: {path}")]
    UnsafePathCharacters { path: String },

    #[error("path {candidate} is outside of {root}")]
    PathEscapesRoot { candidate: String, root: String },
}

/// Reject a path or job timestamp containing `..`.
pub fn validate_no_traversal(path: &str, timestamp: &str) -> Result<(), PathValidationError> {
    if path.contains("..") || timestamp.contains("..") {
        return Err(PathValidationError::InvalidPathParameters);
    }
    Ok(())
}

/// Reject a job timestamp that could not safely name a directory or archive.
pub fn validate_job_timestamp(timestamp: &str) -> Result<(), PathValidationError> {
    if timestamp.is_empty()
        || timestamp.contains("..")
        || timestamp.contains('/')
        || timestamp.contains('\\')
    {
        return Err(PathValidationError::InvalidPathParameters);
    }
    Ok(())
}

/// Reject any path containing a shell metacharacter.
///
/// Applies to every argument handed to the extraction tool, including paths that
/// were already made absolute.
pub fn validate_no_shell_metacharacters<I, P>(paths: I) -> Result<(), PathValidationError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref().to_string_lossy();
        if path.contains(SHELL_METACHARACTERS) {
            return Err(PathValidationError::UnsafePathCharacters {
                path: path.into_owned(),
            });
        }
    }
    Ok(())
}

/// Require `candidate` to be `root` or a descendant of it.
///
/// Both paths are made absolute and lexically normalized first, so `../` escapes and
/// unrelated absolute paths are rejected without touching the filesystem.
pub fn validate_within_root(
    candidate: impl AsRef<Path>,
    root: impl AsRef<Path>,
) -> Result<(), PathValidationError> {
    let candidate = candidate.as_ref();
    let root = root.as_ref();

    let escapes = || PathValidationError::PathEscapesRoot {
        candidate: candidate.display().to_string(),
        root: root.display().to_string(),
    };

    let candidate_abs = absolute_normalized(candidate).ok_or_else(escapes)?;
    let root_abs = absolute_normalized(root).ok_or_else(escapes)?;

    // Component-wise, so `/outputs-evil` never matches `/outputs`.
    if candidate_abs.starts_with(&root_abs) {
        Ok(())
    } else {
        Err(escapes())
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
pub fn absolute_normalized(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    Some(normalize_lexically(&absolute))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
