//! Sumi-Sieve: a resilient classifieds harvester
//!
//! This crate extracts listing links and per-listing fields from a classifieds
//! marketplace whose markup is unstable. Every field is read through an ordered
//! cascade of strategies (embedded JSON, selectors, meta tags, raw patterns), and
//! search results are crawled page by page through a bounded worker pool.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Sieve operations
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("URL {url} does not belong to {domain}")]
    ForeignDomain { url: String, domain: String },
}

/// Page fetch failures
///
/// Recoverable for every page except the first one of a crawl.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// The URL the failed request was made to
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Timeout { url } | Self::Status { url, .. } => url,
        }
    }

    /// Returns true if the request ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Extraction failures
///
/// These never leave a strategy: a failing strategy is simply "no match".
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed structured payload in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Value {value:?} rejected: {reason}")]
    Validation { value: String, reason: String },
}

/// Result type alias for Sumi-Sieve operations
pub type Result<T> = std::result::Result<T, SieveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlContext};
pub use extract::{ExtractionResult, Extracted, FieldExtractor};
pub use state::{CrawlState, PageOutcome};
pub use crate::url::{listing_key, page_url, validate_marketplace_url};
