use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, FieldConfig, LinksConfig, MarketplaceConfig,
    NextPageConfig, PayloadSource, TotalConfig,
};
use crate::extract::{compile_regex, compile_selector, Normalizer, StrategyChain};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
///
/// Every regex and selector in the strategy tables is compiled here, so a
/// config that loads never fails to compile later.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_marketplace_config(&config.marketplace)?;
    validate_payload_sources(&config.structured_data)?;
    validate_links_config(&config.links)?;
    validate_next_page_config(&config.next_page)?;
    validate_total_config(&config.total)?;
    validate_fields(&config.fields)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "per-page must be >= 1, got {}",
            config.per_page
        )));
    }

    if config.safety_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "safety-cap must be >= 1, got {}",
            config.safety_cap
        )));
    }

    if config.fallback_pages < 1 || config.fallback_pages > config.safety_cap {
        return Err(ConfigError::Validation(format!(
            "fallback-pages must be between 1 and safety-cap ({}), got {}",
            config.safety_cap, config.fallback_pages
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    url::Url::parse(&config.referer)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer: {}", e)))?;

    Ok(())
}

fn validate_marketplace_config(config: &MarketplaceConfig) -> Result<(), ConfigError> {
    validate_domain_string(&config.domain)?;

    if config.page_param.is_empty()
        || !config
            .page_param
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "page-param must be a plain query key, got '{}'",
            config.page_param
        )));
    }

    if let Some(template) = &config.short_link {
        if !template.contains("{id}") {
            return Err(ConfigError::Validation(format!(
                "short-link template must contain {{id}}, got '{}'",
                template
            )));
        }
        url::Url::parse(&template.replace("{id}", "0"))
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid short-link: {}", e)))?;
    }

    Ok(())
}

fn validate_payload_sources(sources: &[PayloadSource]) -> Result<(), ConfigError> {
    for source in sources {
        compile_selector(&source.selector)?;
    }
    Ok(())
}

fn validate_links_config(config: &LinksConfig) -> Result<(), ConfigError> {
    compile_regex(&config.listing_pattern)?;

    if config.strategies.is_empty() {
        return Err(ConfigError::Validation(
            "links must have at least one strategy".to_string(),
        ));
    }
    StrategyChain::compile(&config.strategies)?;

    Ok(())
}

fn validate_next_page_config(config: &NextPageConfig) -> Result<(), ConfigError> {
    compile_selector(&config.button_selector)?;
    Ok(())
}

fn validate_total_config(config: &TotalConfig) -> Result<(), ConfigError> {
    if config.count_keys.is_empty() && config.result_words.is_empty() && config.raw_fields.is_empty()
    {
        return Err(ConfigError::Validation(
            "total needs at least one count key, result word, or raw field".to_string(),
        ));
    }
    Ok(())
}

/// Validates field entries: unique names, non-empty chains, compilable patterns
fn validate_fields(fields: &[FieldConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for field in fields {
        if field.name.is_empty() {
            return Err(ConfigError::Validation(
                "field name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "field '{}' is defined more than once",
                field.name
            )));
        }

        if field.strategies.is_empty() {
            return Err(ConfigError::Validation(format!(
                "field '{}' must have at least one strategy",
                field.name
            )));
        }

        StrategyChain::compile(&field.strategies)?;
        Normalizer::compile(&field.normalizer)?;
    }

    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
