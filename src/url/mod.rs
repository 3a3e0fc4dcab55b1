//! URL handling module for Sumi-Sieve
//!
//! This module provides marketplace URL validation, listing deduplication keys,
//! listing id extraction, and result-page URL construction.

mod domain;
mod matcher;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, listing_id};
pub use matcher::matches_domain;
pub use normalize::{listing_key, page_url, start_page};

/// Validates that a user-supplied URL belongs to the marketplace
///
/// This runs before any network activity. The URL must:
/// 1. Parse as an absolute URL
/// 2. Use the HTTP or HTTPS scheme
/// 3. Have a host equal to the marketplace domain, optionally preceded by one
///    subdomain label (see [`matches_domain`])
///
/// # Arguments
///
/// * `url_str` - The URL given on the command line
/// * `domain` - The configured marketplace domain
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The URL is malformed or foreign
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::validate_marketplace_url;
///
/// assert!(validate_marketplace_url("https://sp.olx.com.br/autos", "olx.com.br").is_ok());
/// assert!(validate_marketplace_url("https://example.com/autos", "olx.com.br").is_err());
/// ```
pub fn validate_marketplace_url(url_str: &str, domain: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = extract_domain(&url).ok_or(UrlError::MissingDomain)?;

    if !matches_domain(&domain.to_lowercase(), &host) {
        return Err(UrlError::ForeignDomain {
            url: url.to_string(),
            domain: domain.to_string(),
        });
    }

    Ok(url)
}
