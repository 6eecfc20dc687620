use std::path::PathBuf;

/// A still image produced by the extractor.
///
/// Frames live inside the job workspace until they are archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub path: PathBuf,
    /// 1-based position in extraction order.
    pub sequence: u32,
}

impl Frame {
    pub fn new(path: impl Into<PathBuf>, sequence: u32) -> Self {
        Self {
            path: path.into(),
            sequence,
        }
    }

    /// Basename of the frame file, used as its archive entry name.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    }
}
