use url::Url;

/// Extracts the lowercase host from a URL
///
/// Returns None if the URL has no host (which shouldn't happen for valid
/// HTTP(S) URLs).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sieve::url::extract_domain;
///
/// let url = Url::parse("https://SP.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sp.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts a numeric listing id from a listing URL
///
/// Marketplace listing slugs end in a long numeric id
/// (`.../honda-civic-2019-1457220451`). The id must be between 8 and 12 digits.
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::listing_id;
///
/// assert_eq!(
///     listing_id("https://sp.example.com/autos/honda-civic-1457220451?x=1"),
///     Some("1457220451".to_string())
/// );
/// assert_eq!(listing_id("https://sp.example.com/autos"), None);
/// ```
pub fn listing_id(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.trim_end_matches('/');
    let tail = path.rsplit(['-', '/']).next()?;

    if (8..=12).contains(&tail.len()) && tail.chars().all(|c| c.is_ascii_digit()) {
        Some(tail.to_string())
    } else {
        None
    }
}
