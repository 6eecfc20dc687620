use framegrinder_core::constants::ACCEPTED_VIDEO_EXTENSIONS;
use framegrinder_core::PipelineError;
use std::path::Path;

/// Validation errors for uploaded videos
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidExtension { extension, allowed } => {
                PipelineError::UnsupportedFormat {
                    extension,
                    accepted: allowed.join(", "),
                }
            }
            ValidationError::InvalidFilename(name) => {
                PipelineError::InvalidPathParameters(format!("Invalid filename: {}", name))
            }
        }
    }
}

/// Video upload validator
///
/// Decides acceptance from the declared filename's extension only; the content is
/// left to ffmpeg.
#[derive(Debug, Clone)]
pub struct VideoValidator {
    allowed_extensions: Vec<String>,
}

impl Default for VideoValidator {
    fn default() -> Self {
        Self::new(
            ACCEPTED_VIDEO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        )
    }
}

impl VideoValidator {
    pub fn new(allowed_extensions: Vec<String>) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Validate file extension (case-insensitive). Returns the lowercased extension.
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Base name of a client-declared filename, with any directory part stripped.
    pub fn sanitize_filename(&self, filename: &str) -> Result<String, ValidationError> {
        Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .map(str::to_string)
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_extension() {
        let validator = VideoValidator::default();

        assert_eq!(validator.validate_extension("clip.mp4").unwrap(), "mp4");
        assert_eq!(validator.validate_extension("CLIP.MOV").unwrap(), "mov");
        assert!(validator.validate_extension("archive.tar.webm").is_ok());

        assert!(validator.validate_extension("sample.txt").is_err());
        assert!(validator.validate_extension("mp4").is_err());
        assert!(validator.validate_extension("noext").is_err());
    }

    #[test]
    fn test_unsupported_format_message_lists_accepted() {
        let validator = VideoValidator::default();
        let err: PipelineError = validator.validate_extension("sample.txt").unwrap_err().into();

        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        let message = err.to_string();
        assert!(message.contains("Unsupported file format"));
        assert!(message.contains("'txt'"));
        assert!(message.contains("mp4, avi, mov, mkv, wmv, flv, webm"));
    }

    #[test]
    fn test_sanitize_filename() {
        let validator = VideoValidator::default();

        assert_eq!(validator.sanitize_filename("clip.mp4").unwrap(), "clip.mp4");
        assert_eq!(
            validator.sanitize_filename("../../etc/clip.mp4").unwrap(),
            "clip.mp4"
        );
        assert!(validator.sanitize_filename("").is_err());
        assert!(validator.sanitize_filename("..").is_err());
    }
}
