//! Boundary between the pipeline and a fetch-and-extract strategy
//!
//! The adapter normalizes the URL, runs the strategy under the retry
//! executor with a per-attempt timeout, paces itself with the configured
//! request delay, and turns the outcome into a [`ScrapeResult`]. Extraction
//! failures are reported in the result, never returned as errors.

use crate::config::ScraperConfig;
use crate::crawler::extractor::{ExtractError, FetchOptions, PageExtractor};
use crate::crawler::parser::ExtractedDocument;
use crate::crawler::retry::RetryExecutor;
use crate::crawler::ScrapeResult;
use crate::storage::{now_millis, ScrapeRecord};
use crate::url::normalize_url;
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Wraps a [`PageExtractor`] with normalization, retries and pacing
#[derive(Clone)]
pub struct ExtractionAdapter {
    extractor: Arc<dyn PageExtractor>,
    retry: RetryExecutor,
    options: FetchOptions,
    request_delay: Duration,
}

impl ExtractionAdapter {
    pub fn new(extractor: Arc<dyn PageExtractor>, config: &ScraperConfig) -> Self {
        Self {
            extractor,
            retry: RetryExecutor::from_config(config),
            options: FetchOptions::from_config(config),
            request_delay: config.request_delay(),
        }
    }

    /// Replaces the retry executor
    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    pub fn extractor(&self) -> &Arc<dyn PageExtractor> {
        &self.extractor
    }

    /// Scrapes one URL
    ///
    /// # Returns
    ///
    /// * `success = true` - with a record carrying the extracted fields
    /// * `success = false` - with a failed record and the last attempt's
    ///   error, or with no record if the URL could not be normalized
    pub async fn extract(&self, url: &str) -> ScrapeResult {
        let normalized = match normalize_url(url) {
            Ok(normalized) => normalized,
            Err(e) => return ScrapeResult::failure(HarvestError::InvalidUrl(e).to_string()),
        };

        tracing::info!("Scraping URL: {}", normalized);

        let target = &normalized;
        let outcome = self.retry.run(|| self.fetch_once(target)).await;

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        match outcome {
            Ok(document) => {
                let record = ScrapeRecord::success(&normalized, document, now_millis());
                ScrapeResult::from_record(record)
            }
            Err(e) => {
                tracing::error!("Failed to scrape {}: {}", normalized, e);
                let record = ScrapeRecord::failed(&normalized, e.to_string(), now_millis());
                ScrapeResult::from_record(record)
            }
        }
    }

    /// A single attempt, bounded by the configured timeout
    async fn fetch_once(&self, url: &Url) -> Result<ExtractedDocument, ExtractError> {
        let attempt = self.extractor.fetch_and_extract(url, &self.options);

        match tokio::time::timeout(self.options.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::Timeout(self.options.timeout.as_millis() as u64)),
        }
    }
}
