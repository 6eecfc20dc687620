use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Outcome of one processing request.
///
/// Expected failures (validation, extraction, upload) are reported here with
/// `success: false`; the HTTP layer maps the value to a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default)]
    pub frame_count: usize,
    #[serde(default)]
    pub frame_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ProcessingResult {
    pub fn completed(
        archive_key: String,
        download_url: Option<String>,
        frame_names: Vec<String>,
    ) -> Self {
        let frame_count = frame_names.len();
        Self {
            success: true,
            message: format!("Processing complete! {} frames extracted.", frame_count),
            archive_key: Some(archive_key),
            download_url,
            frame_count,
            frame_names,
            error_code: None,
        }
    }

    pub fn failed(error: &PipelineError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            archive_key: None,
            download_url: None,
            frame_count: 0,
            frame_names: Vec::new(),
            error_code: Some(error.error_code().to_string()),
        }
    }
}

impl From<PipelineError> for ProcessingResult {
    fn from(error: PipelineError) -> Self {
        ProcessingResult::failed(&error)
    }
}
