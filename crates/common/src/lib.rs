//! Fieldnotes Common Library
//!
//! Shared code for the Fieldnotes services including:
//! - Database models, schema bootstrap and the repository
//! - Row-level visibility policy
//! - Record filtering, pagination and association handling
//! - JSON / CSV / Markdown export rendering
//! - Error types, configuration and authentication
//! - Image blob storage and metrics

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod metrics;
pub mod records;
pub mod storage;

// Re-export commonly used types
pub use access::Visibility;
pub use auth::{JwtManager, Principal};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use export::{ExportFormat, ExportFormatter};
pub use storage::{BlobStore, LocalBlobStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
