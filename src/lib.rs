//! Bizcrawl: a resumable business-listing harvester
//!
//! This crate discovers business pages through a listing site's paginated
//! search and extracts each business's detail page into a structured record,
//! rotating identities, retrying under anti-bot defenses and persisting
//! progress so an interrupted run picks up where it stopped.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Detail fetch pool closed")]
    PoolClosed,
}

impl HarvestError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures and the two page-level load failures (challenge,
    /// page not loaded) are retried. Field-level extraction and validation
    /// failures, storage and configuration errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Client(_) | Self::Json(_) => true,
            Self::Extract(e) => matches!(e, ExtractError::Challenge | ExtractError::NotLoaded),
            Self::Config(_) | Self::Storage(_) | Self::Io(_) | Self::PoolClosed => false,
        }
    }

    /// Whether the site served an anti-automation challenge
    pub fn is_challenge(&self) -> bool {
        matches!(self, Self::Extract(ExtractError::Challenge))
    }
}

/// Errors raised while turning a fetched payload into typed data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Encountered captcha")]
    Challenge,

    #[error("Page didn't load successfully")]
    NotLoaded,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {value:?}")]
    Validation { field: &'static str, value: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for extraction operations
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{
    Amenity, BusinessRecord, BusinessStub, HealthScore, OpenHours, PriceTier, ScrapedBusiness,
};
