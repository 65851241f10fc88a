use crate::UrlError;
use url::Url;

/// Schemes that never lead to another chapter page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Parses a URL that may appear in a chain (entry, cursor, or next link)
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse; reject if malformed
/// 2. Require the `http` or `https` scheme
/// 3. Require a host
/// 4. Drop the fragment, which never changes what the server returns
///
/// Host casing and default ports are normalized by the `url` crate itself.
/// Paths and query strings are left alone: chapter sites routinely encode the
/// chapter number in either, and rewriting them could point at another page.
///
/// # Examples
///
/// ```
/// use chapter_chain::url::parse_chain_url;
///
/// let url = parse_chain_url("HTTPS://Example.COM/book/1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/book/1");
/// ```
pub fn parse_chain_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    check_chain_url(&url)?;
    url.set_fragment(None);
    Ok(url)
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should not be followed:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - hrefs that do not resolve to an HTTP(S) URL
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    check_chain_url(&absolute).ok()?;
    absolute.set_fragment(None);
    Some(absolute)
}

fn check_chain_url(url: &Url) -> Result<(), UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(url.to_string()));
    }

    Ok(())
}
