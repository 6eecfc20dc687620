//! Framegrinder CLI support: tracing setup shared by the binaries.

pub mod telemetry;

pub use telemetry::{init_tracing, LogFormat};
