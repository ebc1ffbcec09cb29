//! Fetch-and-extract strategies
//!
//! This module defines the [`PageExtractor`] capability the rest of the
//! pipeline depends on, and the bundled HTTP strategy:
//! - One shared HTTP client for every call, with no cookie store
//! - A per-call user agent and timeout
//! - Status and Content-Type checks before parsing
//! - Error classification into [`ExtractError`]

use crate::config::ScraperConfig;
use crate::crawler::parser::{parse_document, ExtractedDocument};
use crate::crawler::retry::RetryExhausted;
use crate::crawler::user_agent::random_user_agent;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single fetch-and-extract attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Navigation timeout of {0} ms exceeded")]
    Timeout(u64),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The response was not an HTML page
    #[error("Unexpected content type: {0}")]
    ContentMismatch(String),

    #[error("All retry attempts failed")]
    AllAttemptsFailed,
}

impl From<RetryExhausted> for ExtractError {
    fn from(_: RetryExhausted) -> Self {
        ExtractError::AllAttemptsFailed
    }
}

/// Per-call options for a fetch-and-extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,

    /// Fixed user agent; `None` picks a browser agent per attempt
    pub user_agent: Option<String>,

    /// Rendering hint for browser-backed strategies
    pub headless: bool,
}

impl FetchOptions {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            headless: config.headless,
        }
    }

    /// User agent for one attempt
    pub fn user_agent_for_attempt(&self) -> &str {
        match &self.user_agent {
            Some(agent) => agent,
            None => random_user_agent(),
        }
    }
}

/// A strategy that loads one page and extracts its document
///
/// Implementations must keep calls isolated from each other and must apply
/// the content, image and link caps themselves (see [`parse_document`]).
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn fetch_and_extract(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<ExtractedDocument, ExtractError>;

    /// Releases resources held by the strategy
    async fn close(&self) -> Result<(), ExtractError> {
        Ok(())
    }
}

/// Extracts pages over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: Client,
}

impl HttpExtractor {
    /// Creates an extractor with a freshly built client
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

/// Builds the shared HTTP client
///
/// The user agent and timeout are set per request from [`FetchOptions`].
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl PageExtractor for HttpExtractor {
    async fn fetch_and_extract(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<ExtractedDocument, ExtractError> {
        if !options.headless {
            tracing::debug!("HTTP extractor has no visible mode; ignoring headless = false");
        }

        let timeout_ms = options.timeout.as_millis() as u64;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                ExtractError::Timeout(timeout_ms)
            } else {
                ExtractError::Navigation(e.to_string())
            }
        };

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, options.user_agent_for_attempt())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(ExtractError::HttpStatus {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(ExtractError::ContentMismatch(content_type));
        }

        let body = response.text().await.map_err(classify)?;

        Ok(parse_document(&body, &final_url))
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
