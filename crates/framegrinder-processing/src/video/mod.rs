//! Video processing module
//!
//! Frame extraction through an external ffmpeg process.

pub mod extractor;

pub use extractor::FrameExtractor;
