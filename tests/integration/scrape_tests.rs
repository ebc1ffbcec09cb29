//! End-to-end scrapes through the coordinator

use crate::{create_test_config, html_page};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::crawler::{Coordinator, HttpExtractor, RetryExecutor};
use sumi_harvest::state::ScrapeStatus;
use sumi_harvest::storage::{open_shared_store, ScrapeStore, SqliteStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, page: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page(title, &["/other"]), "text/html"),
        )
        .mount(server)
        .await;
}

/// Coordinator over the real HTTP extractor with a short backoff
fn coordinator(dir: &TempDir) -> Coordinator {
    let config = create_test_config(dir);
    let store = open_shared_store(Path::new(&config.storage.database_path)).unwrap();
    let extractor = Arc::new(HttpExtractor::new().unwrap());

    Coordinator::new(&config, extractor, store)
        .with_retry(RetryExecutor::new(2, Duration::from_millis(10)))
}

#[tokio::test]
async fn test_batch_with_failures_is_isolated_and_persisted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/a", "Page A").await;
    mount_page(&mock_server, "/b", "Page B").await;

    // Server errors are retried, then reported
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir);

    let urls = vec![
        format!("{}/a", base_url),
        "not a url".to_string(),
        format!("{}/broken", base_url),
        format!("{}/b", base_url),
    ];
    let results = coordinator.scrape_many(&urls).await;

    assert_eq!(results.len(), 4);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1].error.as_deref().unwrap().starts_with("Invalid URL: "));
    assert!(!results[2].success);
    assert!(results[2].error.as_deref().unwrap().contains("HTTP status 500"));
    assert!(results[3].success);

    assert_eq!(
        results[0].data.as_ref().unwrap().title.as_deref(),
        Some("Page A")
    );

    let stats = coordinator.get_stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.recent, 3);
    assert_eq!(stats.success_rate, 66.67);

    let broken = coordinator
        .get_scraped_data(Some(&format!("{}/broken", base_url)), None)
        .unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].record.status, ScrapeStatus::Failed);

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rescrape_updates_existing_record() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/a", "Page A").await;

    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir);
    let url = format!("{}/a", mock_server.uri());

    coordinator.scrape_one(&url).await;
    let first = coordinator.get_scraped_data(Some(&url), None).unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    coordinator.scrape_one(&url).await;
    let second = coordinator.get_scraped_data(Some(&url), None).unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].created_at, first[0].created_at);
    assert!(second[0].record.scraped_at > first[0].record.scraped_at);
    assert_eq!(coordinator.get_stats().unwrap().total, 1);

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_scrapes_of_same_url_keep_one_record() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/same", "Same").await;

    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir);
    let url = format!("{}/same", mock_server.uri());

    let urls = vec![url.clone(); 6];
    let results = coordinator.scrape_many(&urls).await;

    assert!(results.iter().all(|r| r.success));
    assert_eq!(coordinator.get_stats().unwrap().total, 1);

    coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_records_survive_reopening_database() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/a", "Page A").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir);
    let url = format!("{}/a", mock_server.uri());

    {
        let coordinator = Coordinator::from_config(&config).unwrap();
        let result = coordinator.scrape_one(&url).await;
        assert!(result.success);
        coordinator.shutdown().await.unwrap();
    }

    let store = SqliteStore::new(Path::new(&config.storage.database_path)).unwrap();
    let stored = store.find_by_url(&url).unwrap().unwrap();
    assert_eq!(stored.record.title.as_deref(), Some("Page A"));
    assert_eq!(
        stored.record.links,
        Some(vec![format!("{}/other", mock_server.uri())])
    );
}

#[tokio::test]
async fn test_shutdown_rejects_new_scrapes() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir);

    coordinator.shutdown().await.unwrap();
    let result = coordinator.scrape_one("https://example.com/").await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Scraper is shut down"));
}
