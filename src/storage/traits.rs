//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RecordFilter, ScrapeRecord, StoredRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for document store implementations
///
/// These are the primitives the reconciler and the statistics are built on.
/// Implementations must enforce uniqueness of `url` themselves, as a backstop
/// for writers that bypass the reconciler.
pub trait ScrapeStore {
    /// Finds the record stored for an exact URL
    fn find_by_url(&self, url: &str) -> StorageResult<Option<StoredRecord>>;

    /// Gets a record by its persisted identity
    fn get_record(&self, id: i64) -> StorageResult<StoredRecord>;

    /// Inserts a new record
    ///
    /// Fails with [`StorageError::ConstraintViolation`] if the URL is already stored.
    fn insert_record(&mut self, record: &ScrapeRecord) -> StorageResult<StoredRecord>;

    /// Overwrites every scrape-derived field of an existing record
    ///
    /// The identity and creation timestamp are preserved.
    fn update_record(&mut self, id: i64, record: &ScrapeRecord) -> StorageResult<StoredRecord>;

    /// Counts records matching a filter
    fn count_records(&self, filter: &RecordFilter) -> StorageResult<u64>;

    /// Lists records most-recently-scraped first, optionally for one exact URL
    fn list_records(&self, url: Option<&str>, limit: usize) -> StorageResult<Vec<StoredRecord>>;
}
