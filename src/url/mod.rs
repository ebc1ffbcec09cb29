//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization and the syntactic validation that
//! gates admission: a URL that fails here never reaches the queue.

mod normalize;

pub use normalize::normalize_url;

use crate::UrlResult;

/// Checks that a string is an absolute http(s) URL
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::validate_url;
///
/// assert!(validate_url("https://example.com/").is_ok());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(url_str: &str) -> UrlResult<()> {
    normalize_url(url_str).map(|_| ())
}
