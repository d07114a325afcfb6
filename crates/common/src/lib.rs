//! Cropcut Common Utilities
//!
//! Shared infrastructure for all cropcut crates:
//! - Error types and result aliases
//! - Configuration loading, including the export quality preset table
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
