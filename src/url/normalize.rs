use crate::UrlError;
use url::Url;

/// Normalizes a listing URL into its deduplication key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Lowercase the host
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
/// 5. Remove the whole query string (listing pages carry only tracking state)
/// 6. Remove fragment
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::listing_key;
///
/// let key = listing_key("https://SP.example.com/autos/gol-1234567890/?lis=home#x").unwrap();
/// assert_eq!(key, "https://sp.example.com/autos/gol-1234567890");
/// ```
pub fn listing_key(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Builds the URL of a given result page
///
/// Page `start` (the page the crawl began on) is the base URL verbatim. Every
/// other page rewrites, or appends, exactly one query parameter; all other
/// parameters keep their original encoding and order, and the fragment is kept.
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::page_url;
/// use url::Url;
///
/// let base = Url::parse("https://x.example/search?cat=cars#top").unwrap();
/// assert_eq!(page_url(&base, "o", 1, 1).as_str(), "https://x.example/search?cat=cars#top");
/// assert_eq!(page_url(&base, "o", 1, 3).as_str(), "https://x.example/search?cat=cars&o=3#top");
/// ```
pub fn page_url(base: &Url, param: &str, start: u32, page: u32) -> Url {
    if page == start {
        return base.clone();
    }

    let mut url = base.clone();
    let mut replaced = false;
    let mut segments: Vec<String> = Vec::new();

    if let Some(query) = base.query() {
        for segment in query.split('&').filter(|s| !s.is_empty()) {
            let key = segment.split('=').next().unwrap_or(segment);
            if key == param {
                // Keep only the first occurrence of the page parameter
                if !replaced {
                    segments.push(format!("{}={}", param, page));
                    replaced = true;
                }
            } else {
                segments.push(segment.to_string());
            }
        }
    }

    if !replaced {
        segments.push(format!("{}={}", param, page));
    }

    url.set_query(Some(&segments.join("&")));
    url
}

/// Reads the page number already present on a search URL
///
/// Returns 1 if the parameter is absent or not a positive integer.
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::start_page;
/// use url::Url;
///
/// let url = Url::parse("https://x.example/search?o=4&q=gol").unwrap();
/// assert_eq!(start_page(&url, "o"), 4);
/// ```
pub fn start_page(base: &Url, param: &str) -> u32 {
    base.query_pairs()
        .find(|(key, _)| key == param)
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    format!("/{}", normalized_segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://x.example/search?cat=cars").unwrap()
    }

    #[test]
    fn test_listing_key_drops_query_and_fragment() {
        let key = listing_key("https://sp.example.com/a/gol-12345678?lis=listing_1#photos").unwrap();
        assert_eq!(key, "https://sp.example.com/a/gol-12345678");
    }

    #[test]
    fn test_listing_key_removes_trailing_slash() {
        let key = listing_key("https://sp.example.com/a/gol-12345678/").unwrap();
        assert_eq!(key, "https://sp.example.com/a/gol-12345678");
    }

    #[test]
    fn test_listing_key_keeps_root_slash() {
        let key = listing_key("https://example.com").unwrap();
        assert_eq!(key, "https://example.com/");
    }

    #[test]
    fn test_listing_key_dot_segments() {
        let key = listing_key("https://example.com/a/../b/./c").unwrap();
        assert_eq!(key, "https://example.com/b/c");
    }

    #[test]
    fn test_listing_key_equal_for_variants() {
        let a = listing_key("https://SP.example.com/a/gol-12345678?x=1").unwrap();
        let b = listing_key("https://sp.example.com//a/gol-12345678/#y").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_listing_key_invalid_scheme() {
        let result = listing_key("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_listing_key_malformed() {
        assert!(matches!(
            listing_key("not a url").unwrap_err(),
            UrlError::Parse(_)
        ));
    }

    #[test]
    fn test_page_url_start_page_is_verbatim() {
        assert_eq!(page_url(&base(), "o", 1, 1), base());
    }

    #[test]
    fn test_page_url_appends_param() {
        let url = page_url(&base(), "o", 1, 2);
        assert_eq!(url.as_str(), "https://x.example/search?cat=cars&o=2");
    }

    #[test]
    fn test_page_url_rewrites_existing_param_in_place() {
        let base = Url::parse("https://x.example/search?o=1&cat=cars&q=gol%20g5").unwrap();
        let url = page_url(&base, "o", 1, 5);
        assert_eq!(url.as_str(), "https://x.example/search?o=5&cat=cars&q=gol%20g5");
    }

    #[test]
    fn test_page_url_collapses_duplicate_param() {
        let base = Url::parse("https://x.example/search?o=1&o=2&cat=cars").unwrap();
        let url = page_url(&base, "o", 1, 3);
        assert_eq!(url.as_str(), "https://x.example/search?o=3&cat=cars");
    }

    #[test]
    fn test_page_url_keeps_fragment() {
        let base = Url::parse("https://x.example/search?cat=cars#results").unwrap();
        let url = page_url(&base, "o", 1, 2);
        assert_eq!(url.as_str(), "https://x.example/search?cat=cars&o=2#results");
    }

    #[test]
    fn test_page_url_without_query() {
        let base = Url::parse("https://x.example/search").unwrap();
        let url = page_url(&base, "o", 1, 2);
        assert_eq!(url.as_str(), "https://x.example/search?o=2");
    }

    #[test]
    fn test_page_url_does_not_touch_similar_keys() {
        let base = Url::parse("https://x.example/search?order=price").unwrap();
        let url = page_url(&base, "o", 1, 2);
        assert_eq!(url.as_str(), "https://x.example/search?order=price&o=2");
    }

    #[test]
    fn test_start_page_defaults_to_one() {
        assert_eq!(start_page(&base(), "o"), 1);
        let zero = Url::parse("https://x.example/search?o=0").unwrap();
        assert_eq!(start_page(&zero, "o"), 1);
        let junk = Url::parse("https://x.example/search?o=abc").unwrap();
        assert_eq!(start_page(&junk, "o"), 1);
    }
}
