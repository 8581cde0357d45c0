//! DocForge Common Library
//!
//! Shared code for the DocForge services including:
//! - Configuration management
//! - Error types and handling
//! - Database pool and chunk repository
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{ChunkStore, DbPool, NewChunk, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
