//! Integration tests for the scraper
//!
//! These tests use wiremock to create mock HTTP servers and drive the HTTP
//! extractor and the full coordinator end-to-end against a SQLite file.

mod extractor_tests;
mod scrape_tests;

use sumi_harvest::config::Config;
use tempfile::TempDir;

/// Creates a test configuration backed by a database in `dir`
pub fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.scraper.max_concurrent_requests = 3;
    config.scraper.request_delay = 0;
    config.scraper.retry_attempts = 2;
    config.scraper.timeout = 2000;
    config.scraper.user_agent = Some("TestBot/1.0".to_string());
    config.scraper.drain_timeout = 5000;
    config.storage.database_path = dir
        .path()
        .join("harvest.db")
        .to_string_lossy()
        .into_owned();
    config
}

/// An HTML page with a title and the given links
pub fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        r#"<html><head><title>{}</title>
        <meta name="description" content="About {}">
        </head><body><p>Welcome to {}</p>{}</body></html>"#,
        title, title, title, anchors
    )
}
