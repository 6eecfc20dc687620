//! Framegrinder Storage Library
//!
//! This crate provides the [`Storage`] capability set and its two implementations:
//! the local filesystem and S3-compatible object storage.
//!
//! # Storage key format
//!
//! Keys are flat object names relative to the backend root (a directory for local
//! storage, a bucket for S3), e.g. `frames_20240101_120000_abcd1234.zip`.
//! Keys must not contain `..`, a backslash, or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_storage, create_upload_storage};
pub use framegrinder_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
