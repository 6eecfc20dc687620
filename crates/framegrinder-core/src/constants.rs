//! Pipeline-wide constants.

/// Video container extensions accepted for processing (lowercase, without the dot).
pub const ACCEPTED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Characters that are never allowed in an argument handed to the extraction tool.
pub const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '(', ')', '{', '}', '[', ']', '*', '?', '<', '>', '~',
];

/// Sampling filter passed to ffmpeg. Not configurable.
pub const FRAME_SAMPLING_FILTER: &str = "fps=1";

/// Image extension of extracted frames.
pub const FRAME_EXTENSION: &str = "png";

/// Output pattern for extracted frames, relative to the job workspace.
pub const FRAME_PATTERN: &str = "frame_%04d.png";

/// Extension of the produced archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Prefix of every produced archive name.
pub const ARCHIVE_PREFIX: &str = "frames_";

/// Build the archive name for a job: `frames_<timestamp>.zip`.
pub fn archive_name(timestamp: &str) -> String {
    format!("{}{}.{}", ARCHIVE_PREFIX, timestamp, ARCHIVE_EXTENSION)
}
