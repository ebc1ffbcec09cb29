//! Storage module for persisting scrape records
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The record model shared by the extractor, reconciler and statistics
//! - Insert-or-update reconciliation keyed by URL

mod reconcile;
mod schema;
mod sqlite;
mod traits;

pub use reconcile::{lock_store, Reconciler};
pub use sqlite::SqliteStore;
pub use traits::{ScrapeStore, StorageError, StorageResult};

use crate::crawler::ExtractedDocument;
use crate::state::ScrapeStatus;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;

/// A store handle shared by every in-flight scrape
pub type SharedStore = Arc<Mutex<dyn ScrapeStore + Send>>;

/// Default number of records returned by a listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Opens the SQLite store at `path` and wraps it for sharing
pub fn open_shared_store(path: &Path) -> StorageResult<SharedStore> {
    let store = SqliteStore::new(path)?;
    Ok(Arc::new(Mutex::new(store)))
}

/// Current time at the precision the database keeps
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// The outcome of scraping one URL, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRecord {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
    pub images: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
    pub scraped_at: DateTime<Utc>,
    pub status: ScrapeStatus,
    pub error: Option<String>,
}

impl ScrapeRecord {
    /// Builds a successful record from an extracted document
    pub fn success(url: &Url, document: ExtractedDocument, scraped_at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            title: Some(document.title),
            description: Some(document.description),
            content: Some(document.content),
            metadata: Some(document.metadata),
            images: Some(document.images),
            links: Some(document.links),
            scraped_at,
            status: ScrapeStatus::Success,
            error: None,
        }
    }

    /// Builds a failed record carrying the last error message
    pub fn failed(url: &Url, error: impl Into<String>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            description: None,
            content: None,
            metadata: None,
            images: None,
            links: None,
            scraped_at,
            status: ScrapeStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// A record together with its persisted identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: ScrapeRecord,
}

/// Filters accepted by [`ScrapeStore::count_records`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    All,
    Status(ScrapeStatus),
    ScrapedSince(DateTime<Utc>),
}
