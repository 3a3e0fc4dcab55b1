//! Configuration module for Sumi-Sieve
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. A complete configuration, including the marketplace strategy table,
//! is built into the binary; `--config` replaces it with a file.
//!
//! # Example
//!
//! ```no_run
//! use sumi_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sieve.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, FieldConfig, LinksConfig, MarketplaceConfig,
    NextPageConfig, NormalizerConfig, PayloadSource, StrategyConfig, StrategyKindConfig,
    TextSource, TotalConfig, UnknownTotalPolicy,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_builtin, load_config, load_config_with_hash, parse_config,
    BUILTIN_CONFIG,
};

impl Config {
    /// The built-in configuration
    pub fn builtin() -> Result<Self, crate::ConfigError> {
        load_builtin()
    }

    /// Re-checks the configuration, e.g. after command-line overrides
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        validation::validate(self)
    }
}
