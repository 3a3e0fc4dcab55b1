//! Search-page link extraction and "next page" detection

use crate::config::{LinksConfig, NextPageConfig};
use crate::extract::compile_selector;
use crate::extract::normalize::Normalizer;
use crate::extract::page::{collapse_whitespace, PageContent};
use crate::extract::strategy::StrategyChain;
use crate::url::matches_domain;
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;

/// Listing links found on one search page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkBatch {
    /// Listing keys, deduplicated, in document order
    pub links: Vec<String>,
    /// Strategy that produced them
    pub source: Option<String>,
}

impl LinkBatch {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Listing-link cascade for search pages
///
/// The first strategy yielding at least one valid listing link supplies the
/// page's links. Candidates are resolved against the page URL, reduced to
/// their listing key, and must match the listing pattern and stay on the
/// marketplace domain.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    chain: StrategyChain,
    normalizer: Normalizer,
    domain: String,
}

impl LinkExtractor {
    pub fn from_config(config: &LinksConfig, domain: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            chain: StrategyChain::compile(&config.strategies)?,
            normalizer: Normalizer::listing_url(&config.listing_pattern)?,
            domain: domain.to_lowercase(),
        })
    }

    pub fn extract(&self, page: &PageContent) -> LinkBatch {
        for strategy in self.chain.iter() {
            let mut seen = HashSet::new();
            let links: Vec<String> = strategy
                .candidates(page)
                .iter()
                .filter_map(|raw| self.normalizer.normalize(raw, page.url()).ok())
                .filter(|key| self.on_marketplace(key))
                .filter(|key| seen.insert(key.clone()))
                .collect();

            if !links.is_empty() {
                tracing::debug!(
                    source = %strategy.name,
                    count = links.len(),
                    "Listing links extracted"
                );
                return LinkBatch {
                    links,
                    source: Some(strategy.name.clone()),
                };
            }
        }

        LinkBatch::default()
    }

    fn on_marketplace(&self, key: &str) -> bool {
        url::Url::parse(key)
            .ok()
            .and_then(|u| crate::url::extract_domain(&u))
            .map(|host| matches_domain(&self.domain, &host))
            .unwrap_or(false)
    }
}

/// How a "next page" affordance was recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextSignal {
    /// An anchor whose text is exactly a configured label
    ExactText,
    /// An anchor whose text contains a label, ignoring case
    CaseInsensitiveText,
    /// A pagination button carrying the button text
    Button,
    Absent,
}

impl NextSignal {
    pub fn is_present(self) -> bool {
        !matches!(self, NextSignal::Absent)
    }
}

/// Detects the "next page" affordance on a search page
#[derive(Debug, Clone)]
pub struct NextPageDetector {
    labels: Vec<String>,
    anchors: Selector,
    button: Selector,
    button_text: String,
}

impl NextPageDetector {
    pub fn from_config(config: &NextPageConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            labels: config.labels.iter().map(|l| collapse_whitespace(l)).collect(),
            anchors: compile_selector("a")?,
            button: compile_selector(&config.button_selector)?,
            button_text: config.button_text.to_lowercase(),
        })
    }

    pub fn detect(&self, page: &PageContent) -> NextSignal {
        let anchor_texts: Vec<String> = page
            .document()
            .select(&self.anchors)
            .map(|a| collapse_whitespace(&a.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
            .collect();

        if anchor_texts
            .iter()
            .any(|t| self.labels.iter().any(|l| t == l))
        {
            return NextSignal::ExactText;
        }

        let lowered: Vec<String> = self.labels.iter().map(|l| l.to_lowercase()).collect();
        if anchor_texts.iter().any(|t| {
            let t = t.to_lowercase();
            lowered.iter().any(|l| t.contains(l.as_str()))
        }) {
            return NextSignal::CaseInsensitiveText;
        }

        if !self.button_text.is_empty()
            && page.document().select(&self.button).any(|b| {
                b.text()
                    .collect::<String>()
                    .to_lowercase()
                    .contains(&self.button_text)
            })
        {
            return NextSignal::Button;
        }

        NextSignal::Absent
    }
}
