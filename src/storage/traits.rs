//! Storage traits and error types
//!
//! This module defines the trait interface for record sinks and
//! associated error types.

use crate::model::ScrapedBusiness;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for extracted businesses
///
/// Implementations must be safe to share between concurrent detail fetches:
/// `append` serializes writers so no two records interleave.
pub trait RecordSink: Send + Sync {
    /// Whether the business was already present when the sink was opened
    fn has(&self, biz_id: &str) -> bool;

    /// Appends one record as a single self-contained entry
    fn append(&self, record: &ScrapedBusiness) -> StorageResult<()>;
}
