//! Crawler module for page scraping
//!
//! This module contains the core scraping pipeline, including:
//! - Retries with exponential backoff
//! - A concurrency- and rate-limited queue
//! - Fetch-and-extract strategies and HTML parsing
//! - Overall scrape coordination

mod adapter;
mod coordinator;
mod extractor;
mod parser;
mod queue;
mod retry;
mod user_agent;

pub use adapter::ExtractionAdapter;
pub use coordinator::Coordinator;
pub use extractor::{build_http_client, ExtractError, FetchOptions, HttpExtractor, PageExtractor};
pub use parser::{parse_document, ExtractedDocument, MAX_CONTENT_CHARS, MAX_IMAGES, MAX_LINKS};
pub use queue::{QueueError, RateLimitedQueue, TaskHandle};
pub use retry::{RetryExecutor, RetryExhausted, DEFAULT_BACKOFF_BASE};
pub use user_agent::{random_user_agent, BROWSER_USER_AGENTS};

use crate::state::ScrapeStatus;
use crate::storage::ScrapeRecord;
use serde::Serialize;

/// Outcome of one scrape request, as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ScrapeRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResult {
    /// A result carrying a record; successful unless the record failed
    pub fn from_record(record: ScrapeRecord) -> Self {
        Self {
            success: record.status != ScrapeStatus::Failed,
            error: record.error.clone(),
            data: Some(record),
        }
    }

    /// A result for a request that produced no record
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
