//! Framegrinder Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and path
//! validation shared by the storage and processing crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, S3Config};
pub use error::{LogLevel, PipelineError};
pub use models::{DownloadLocation, Frame, JobTimestamp, ProcessingResult, StorageObject};
pub use storage_types::StorageBackend;
pub use validation::PathValidationError;
