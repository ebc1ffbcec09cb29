//! Scrape coordinator - main orchestration logic
//!
//! This module composes the pipeline for every submitted URL:
//! - Syntactic validation (invalid URLs never enter the queue)
//! - Admission into the rate-limited queue
//! - Extraction with retries, then reconciliation into the store
//! - Statistics and record listing over the store
//! - Cooperative shutdown

use crate::config::Config;
use crate::crawler::adapter::ExtractionAdapter;
use crate::crawler::extractor::{HttpExtractor, PageExtractor};
use crate::crawler::queue::RateLimitedQueue;
use crate::crawler::retry::RetryExecutor;
use crate::crawler::ScrapeResult;
use crate::output::{compute_stats, RunStats};
use crate::storage::{
    lock_store, now_millis, open_shared_store, Reconciler, SharedStore, StoredRecord,
    DEFAULT_LIST_LIMIT,
};
use crate::url::validate_url;
use crate::HarvestError;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Main scrape coordinator structure
pub struct Coordinator {
    adapter: ExtractionAdapter,
    reconciler: Reconciler,
    queue: RateLimitedQueue,
    drain_timeout: Duration,
}

impl Coordinator {
    /// Creates a coordinator from explicit collaborators
    ///
    /// The queue allows `max-concurrent-requests` scrapes at once and starts
    /// at most one scrape per `request-delay`. Must be called inside a tokio
    /// runtime.
    pub fn new(config: &Config, extractor: Arc<dyn PageExtractor>, store: SharedStore) -> Self {
        let scraper = &config.scraper;

        Self {
            adapter: ExtractionAdapter::new(extractor, scraper),
            reconciler: Reconciler::new(store),
            queue: RateLimitedQueue::new(
                scraper.max_concurrent_requests as usize,
                scraper.request_delay(),
            ),
            drain_timeout: scraper.drain_timeout(),
        }
    }

    /// Creates a coordinator backed by the configured SQLite database and
    /// the HTTP extractor
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The store or HTTP client could not be initialized
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let store = open_shared_store(Path::new(&config.storage.database_path))?;
        let extractor = Arc::new(HttpExtractor::new()?);

        tracing::info!("Scraper initialized with database {}", config.storage.database_path);

        Ok(Self::new(config, extractor, store))
    }

    /// Replaces the retry executor used for extraction
    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.adapter = self.adapter.with_retry(retry);
        self
    }

    pub fn queue(&self) -> &RateLimitedQueue {
        &self.queue
    }

    pub fn store(&self) -> &SharedStore {
        self.reconciler.store()
    }

    /// Scrapes one URL and persists the outcome
    ///
    /// Never fails: invalid input, extraction failures, persistence failures
    /// and shutdown are all reported through the returned result.
    pub async fn scrape_one(&self, url: &str) -> ScrapeResult {
        if let Err(e) = validate_url(url) {
            let error = HarvestError::InvalidUrl(e).to_string();
            tracing::warn!("Rejected {}: {}", url, error);
            return ScrapeResult::failure(error);
        }

        let adapter = self.adapter.clone();
        let reconciler = self.reconciler.clone();
        let url = url.to_string();

        let handle = self.queue.submit(move || async move {
            let mut result = adapter.extract(&url).await;

            if let Some(record) = &result.data {
                if let Err(e) = reconciler.reconcile(record) {
                    tracing::error!("Failed to persist {}: {}", record.url, e);
                    result.success = false;
                    result.error = Some(HarvestError::Storage(e).to_string());
                }
            }

            result
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => ScrapeResult::failure(e.to_string()),
        }
    }

    /// Scrapes every URL independently
    ///
    /// The output has one result per input, in input order. A failure at one
    /// position never affects the others.
    pub async fn scrape_many<S: AsRef<str>>(&self, urls: &[S]) -> Vec<ScrapeResult> {
        tracing::info!("Starting batch scrape of {} URLs", urls.len());

        let results = join_all(urls.iter().map(|url| self.scrape_one(url.as_ref()))).await;

        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            "Batch complete: {} succeeded, {} failed",
            succeeded,
            results.len() - succeeded
        );

        results
    }

    /// Computes statistics over every stored record
    pub fn get_stats(&self) -> Result<RunStats, HarvestError> {
        let store = lock_store(self.store())?;
        Ok(compute_stats(&*store, now_millis())?)
    }

    /// Lists stored records, most recently scraped first
    ///
    /// # Arguments
    ///
    /// * `url` - Restrict to the record for this exact URL
    /// * `limit` - Maximum records returned (default 100)
    pub fn get_scraped_data(
        &self,
        url: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredRecord>, HarvestError> {
        let store = lock_store(self.store())?;
        Ok(store.list_records(url, limit.unwrap_or(DEFAULT_LIST_LIMIT))?)
    }

    /// Stops admitting work, drains the queue, then closes the extractor
    ///
    /// The extractor is closed even if the drain deadline passes; the drain
    /// error is returned afterwards.
    pub async fn shutdown(&self) -> Result<(), HarvestError> {
        tracing::info!("Shutting down scraper");

        let drained = self.queue.shutdown(self.drain_timeout).await;
        if let Err(e) = &drained {
            tracing::warn!("Shutdown drain incomplete: {}", e);
        }

        self.adapter.extractor().close().await?;
        drained?;

        tracing::info!("Scraper shut down");
        Ok(())
    }
}
