//! Sumi-Harvest: a polite structured-record harvester
//!
//! This crate fetches web pages at bounded concurrency, extracts a structured
//! record from each one, retries transient failures with exponential backoff,
//! and reconciles every outcome into a SQLite store that keeps at most one
//! record per URL.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] crawler::ExtractError),

    #[error("Database error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] crawler::QueueError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("{0}")]
    Parse(String),

    #[error("unsupported scheme '{0}', expected http or https")]
    InvalidScheme(String),

    #[error("missing host in '{0}'")]
    MissingHost(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, ScrapeResult};
pub use output::RunStats;
pub use state::ScrapeStatus;
pub use storage::{ScrapeRecord, SqliteStore, StoredRecord};
pub use crate::url::{normalize_url, validate_url};
