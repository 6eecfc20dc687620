//! Key rules shared by both backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could address anything outside the backend root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Content type for a key when the caller did not supply one.
pub fn content_type_for_key(key: &str) -> &'static str {
    let lower = key.to_ascii_lowercase();
    if lower.ends_with(".zip") {
        "application/zip"
    } else if lower.ends_with(".mp4") {
        "video/mp4"
    } else {
        "binary/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_keys() {
        for key in ["", "../etc/passwd", "/etc/passwd", "a/../../b", "a\\b"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
        assert!(validate_key("frames_1.zip").is_ok());
        assert!(validate_key("uploads/20240101_video.mp4").is_ok());
    }

    #[test]
    fn infers_content_type_from_extension() {
        assert_eq!(content_type_for_key("frames_1.zip"), "application/zip");
        assert_eq!(content_type_for_key("FRAMES_1.ZIP"), "application/zip");
        assert_eq!(content_type_for_key("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for_key("clip.mkv"), "binary/octet-stream");
    }
}
