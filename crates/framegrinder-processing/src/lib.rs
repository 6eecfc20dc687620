//! Framegrinder Processing Library
//!
//! This crate turns a video into a zip archive of still frames sampled at one
//! frame per second:
//! - Upload validation (accepted container extensions)
//! - Per-job workspace lifecycle
//! - Frame extraction through an external ffmpeg process
//! - Archive building
//! - Orchestration of the above against a [`framegrinder_storage::Storage`] backend
//! - Listing and managing finished archives

pub mod archive;
pub mod catalog;
pub mod orchestration;
pub mod request;
pub mod validator;
pub mod video;
pub mod workspace;

pub use archive::ArchiveBuilder;
pub use catalog::{ArchiveCatalog, ArchiveSummary};
pub use orchestration::ProcessingOrchestrator;
pub use request::ProcessingRequest;
pub use validator::{ValidationError, VideoValidator};
pub use video::FrameExtractor;
pub use workspace::Workspace;
