use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Maximum number of scrapes executing at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Minimum spacing between scrape starts, and pause after each scrape (milliseconds)
    #[serde(rename = "request-delay")]
    pub request_delay: u64,

    /// Attempts per URL before the scrape is reported as failed
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,

    /// Upper bound on a single fetch-and-extract attempt (milliseconds)
    pub timeout: u64,

    /// User agent override; unset means a random browser agent per attempt
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    /// Rendering hint for browser-backed extractors
    pub headless: bool,

    /// How long shutdown waits for queued and in-flight scrapes (milliseconds)
    #[serde(rename = "drain-timeout")]
    pub drain_timeout: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            request_delay: 1000,
            retry_attempts: 3,
            timeout: 30_000,
            user_agent: None,
            headless: true,
            drain_timeout: 30_000,
        }
    }
}

impl ScraperConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./sumi-harvest.db".to_string(),
        }
    }
}
