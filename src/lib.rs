//! Postbox Exporter Library
//!
//! A Rust engine for batch-exporting documents from a paginated postbox
//! rendering. Provides strictly sequential iteration with cooperative
//! cancellation, per-item error isolation, retrying transfers and templated
//! destination filenames.

pub mod app;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
