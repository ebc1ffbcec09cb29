//! HTML parser for extracting page documents
//!
//! This module turns a fetched HTML page into an [`ExtractedDocument`]:
//! - Title (from `<title>`, falling back to the first `<h1>`)
//! - Description (meta description, falling back to `og:description`)
//! - Visible body text
//! - Image and link URLs, resolved against the page URL
//! - Every named `<meta>` tag
//!
//! The size caps on content, images and links are applied here, so every
//! document handed to the rest of the pipeline is already bounded.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use url::Url;

/// Maximum characters of body text kept
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Maximum image URLs kept
pub const MAX_IMAGES: usize = 50;

/// Maximum distinct link URLs kept
pub const MAX_LINKS: usize = 100;

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Structured data extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub title: String,
    pub description: String,
    pub content: String,
    pub images: Vec<String>,
    pub links: Vec<String>,
    pub metadata: Map<String, Value>,
}

/// Parses HTML content into an extracted document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` resolving to an `http` or `https` URL
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and other non-HTTP schemes
/// - Repeats of a link already seen (first occurrence wins)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page URL, used to resolve relative references
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::parse_document;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let document = parse_document(html, &base_url);
/// assert_eq!(document.title, "Test");
/// assert_eq!(document.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_document(html: &str, base_url: &Url) -> ExtractedDocument {
    let document = Html::parse_document(html);

    ExtractedDocument {
        title: extract_title(&document),
        description: extract_description(&document),
        content: extract_content(&document),
        images: extract_images(&document, base_url),
        links: extract_links(&document, base_url),
        metadata: extract_metadata(&document),
    }
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn extract_title(document: &Html) -> String {
    first_text(document, "title")
        .or_else(|| first_text(document, "h1"))
        .unwrap_or_default()
}

fn extract_description(document: &Html) -> String {
    first_attr(document, r#"meta[name="description"]"#, "content")
        .or_else(|| first_attr(document, r#"meta[property="og:description"]"#, "content"))
        .unwrap_or_default()
}

/// Visible text of the body, whitespace-collapsed and truncated
fn extract_content(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let text = visible_text(root);
    text.chars().take(MAX_CONTENT_CHARS).collect()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut chunks = Vec::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let chunk = collapse_whitespace(text);
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
    }

    chunks.join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .filter_map(|src| base_url.join(src).ok())
        .filter(|url| url.scheme() != "data")
        .map(|url| url.to_string())
        .take(MAX_IMAGES)
        .collect()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|link| seen.insert(link.clone()))
        .take(MAX_LINKS)
        .collect()
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, unresolvable references and any scheme
/// other than `http` or `https`.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}

fn extract_metadata(document: &Html) -> Map<String, Value> {
    let mut metadata = Map::new();
    let Ok(selector) = Selector::parse("meta") else {
        return metadata;
    };

    for element in document.select(&selector) {
        let tag = element.value();
        let name = tag
            .attr("name")
            .filter(|name| !name.is_empty())
            .or_else(|| tag.attr("property"))
            .filter(|name| !name.is_empty());
        let content = tag.attr("content").filter(|content| !content.is_empty());

        if let (Some(name), Some(content)) = (name, content) {
            metadata.insert(name.to_string(), Value::String(content.to_string()));
        }
    }

    metadata
}
