//! FrameExtractor - samples a video into PNG stills with ffmpeg.

use framegrinder_core::constants::{FRAME_EXTENSION, FRAME_PATTERN, FRAME_SAMPLING_FILTER};
use framegrinder_core::validation::{
    absolute_normalized, validate_no_shell_metacharacters, validate_no_traversal,
};
use framegrinder_core::{Frame, PipelineError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct FrameExtractor {
    ffmpeg_path: String,
}

impl FrameExtractor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Extract one frame per second of `video_path` into `workspace_dir`.
    ///
    /// Every argument is absolute and checked for traversal and shell
    /// metacharacters before ffmpeg is started.
    #[tracing::instrument(skip(self), fields(ffmpeg = %self.ffmpeg_path))]
    pub async fn extract(
        &self,
        video_path: &Path,
        workspace_dir: &Path,
    ) -> Result<Vec<Frame>, PipelineError> {
        let input = absolute_normalized(video_path).ok_or_else(|| {
            PipelineError::InvalidPathParameters(format!(
                "Cannot resolve video path {}",
                video_path.display()
            ))
        })?;
        let workspace = absolute_normalized(workspace_dir).ok_or_else(|| {
            PipelineError::InvalidPathParameters(format!(
                "Cannot resolve workspace {}",
                workspace_dir.display()
            ))
        })?;
        let pattern = workspace.join(FRAME_PATTERN);

        validate_no_traversal(&input.to_string_lossy(), &pattern.to_string_lossy())?;
        validate_no_shell_metacharacters([&input, &pattern])?;

        let start = std::time::Instant::now();

        let output = Command::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(&input)
            .arg("-vf")
            .arg(FRAME_SAMPLING_FILTER)
            .arg("-y")
            .arg(&pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                PipelineError::ExtractionFailed(format!(
                    "Failed to execute {}: {}",
                    self.ffmpeg_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let diagnostic = format!("{}{}", stdout, stderr).trim().to_string();
            return Err(PipelineError::ExtractionFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status, diagnostic
            )));
        }

        let frames = list_frames(&workspace).await?;

        tracing::info!(
            input = %input.display(),
            frame_count = frames.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Frame extraction complete"
        );

        Ok(frames)
    }
}

/// Frame files in `dir` in extraction order, numbered from 1.
///
/// Ordering follows the numeric suffix of `frame_<n>` so that `frame_10000`
/// comes after `frame_9999`; the file name breaks ties.
pub async fn list_frames(dir: &Path) -> Result<Vec<Frame>, PipelineError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        tracing::warn!(dir = %dir.display(), error = %e, "Failed to list workspace");
        PipelineError::NoFramesProduced
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                let is_frame = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(FRAME_EXTENSION));
                if is_frame && path.is_file() {
                    paths.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to list workspace");
                return Err(PipelineError::NoFramesProduced);
            }
        }
    }

    if paths.is_empty() {
        return Err(PipelineError::NoFramesProduced);
    }

    paths.sort_by_cached_key(|path| (frame_number(path).unwrap_or(u64::MAX), path.clone()));
    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| Frame::new(path, i as u32 + 1))
        .collect())
}

/// Numeric suffix of a frame file stem, e.g. 42 for `frame_0042.png`.
fn frame_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('_')?;
    digits.parse().ok()
}
