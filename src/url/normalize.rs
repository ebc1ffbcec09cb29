use crate::UrlError;
use url::Url;

/// Normalizes a URL string to the absolute form used as the storage key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or relative
/// 2. Accept only `http` and `https` schemes
/// 3. Require a host
/// 4. Serialize through [`Url`], which lowercases scheme and host, drops
///    default ports, and resolves dot segments
///
/// Query strings and fragments are kept as given: two URLs that differ only
/// in their query are different records.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM:443/a/../b").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/b");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(format!("'{}': {}", url_str, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost(url_str.to_string())),
    }
}
