//! Input validation module

pub mod path;

pub use path::{
    absolute_normalized, validate_job_timestamp, validate_no_shell_metacharacters,
    validate_no_traversal, validate_within_root, PathValidationError,
};
