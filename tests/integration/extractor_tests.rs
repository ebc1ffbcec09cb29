//! HTTP extractor behavior against a mock server

use crate::html_page;
use std::time::Duration;
use sumi_harvest::crawler::{ExtractError, FetchOptions, HttpExtractor, PageExtractor};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(timeout_ms: u64) -> FetchOptions {
    FetchOptions {
        timeout: Duration::from_millis(timeout_ms),
        user_agent: Some("TestBot/1.0".to_string()),
        headless: true,
    }
}

fn page_url(server: &MockServer, page: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page)).unwrap()
}

#[tokio::test]
async fn test_extracts_document_with_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    html_page("Home", &["/page1", "/page2", "/page1"]),
                    "text/html; charset=utf-8",
                ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let extractor = HttpExtractor::new().unwrap();
    let document = extractor
        .fetch_and_extract(&page_url(&mock_server, "/"), &options(2000))
        .await
        .unwrap();

    assert_eq!(document.title, "Home");
    assert_eq!(document.description, "About Home");
    assert!(document.content.contains("Welcome to Home"));
    assert_eq!(
        document.links,
        vec![
            format!("{}/page1", mock_server.uri()),
            format!("{}/page2", mock_server.uri()),
        ]
    );
    assert_eq!(
        document.metadata.get("description").and_then(|v| v.as_str()),
        Some("About Home")
    );
}

#[tokio::test]
async fn test_not_found_is_http_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let extractor = HttpExtractor::new().unwrap();
    let err = extractor
        .fetch_and_extract(&page_url(&mock_server, "/missing"), &options(2000))
        .await
        .unwrap_err();

    match err {
        ExtractError::HttpStatus { status, url } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/missing"));
        }
        other => panic!("expected HttpStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_html_is_content_mismatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{}", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let extractor = HttpExtractor::new().unwrap();
    let err = extractor
        .fetch_and_extract(&page_url(&mock_server, "/data.json"), &options(2000))
        .await
        .unwrap_err();

    assert_eq!(err, ExtractError::ContentMismatch("application/json".to_string()));
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("Slow", &[]), "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let extractor = HttpExtractor::new().unwrap();
    let err = extractor
        .fetch_and_extract(&page_url(&mock_server, "/slow"), &options(200))
        .await
        .unwrap_err();

    assert_eq!(err, ExtractError::Timeout(200));
}

#[tokio::test]
async fn test_connection_refused_is_navigation_error() {
    let extractor = HttpExtractor::new().unwrap();
    let url = Url::parse("http://127.0.0.1:1/").unwrap();

    let err = extractor
        .fetch_and_extract(&url, &options(2000))
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Navigation(_)), "got {:?}", err);
}
