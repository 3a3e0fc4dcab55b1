//! Multi-strategy extraction engine
//!
//! This module turns a fetched page into values:
//! - [`PageContent`]: the page parsed once (DOM, visible text, embedded JSON)
//! - [`StrategyChain`]: ordered, side-effect-free lookups compiled from the
//!   configured strategy tables
//! - [`Normalizer`]: value cleaning and shape validation
//! - [`FieldExtractor`]: first valid value wins, with provenance
//! - [`LinkExtractor`] and [`NextPageDetector`]: search-page links and the
//!   "next page" affordance
//! - [`TotalEstimator`]: result-count estimation for sizing a crawl

mod field;
pub mod json_search;
mod links;
mod normalize;
mod page;
mod strategy;
mod total;

pub use field::{ExtractionResult, Extracted, FieldExtractor, FieldSpec};
pub use links::{LinkBatch, LinkExtractor, NextPageDetector, NextSignal};
pub use normalize::Normalizer;
pub use page::{collapse_whitespace, PageContent, Payload, PayloadSources};
pub use strategy::{Strategy, StrategyChain, StrategyKind};
pub use total::{TotalEstimate, TotalEstimator};

use crate::ConfigError;
use scraper::Selector;

/// Compiles a CSS selector, mapping failures to a configuration error
pub fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidPattern(format!("selector '{}': {:?}", selector, e)))
}

/// Compiles a regex, mapping failures to a configuration error
pub fn compile_regex(pattern: &str) -> Result<regex::Regex, ConfigError> {
    regex::Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}
