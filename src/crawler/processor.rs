//! Page processors
//!
//! A processor turns one fetched body into keyed items for the crawl state.
//! Processing is synchronous: the parsed page never lives across an `.await`.

use crate::config::Config;
use crate::crawler::pagination::PageDescriptor;
use crate::extract::{
    ExtractionResult, FieldExtractor, LinkBatch, LinkExtractor, NextPageDetector, NextSignal,
    PageContent, PayloadSources, TotalEstimate, TotalEstimator,
};
use crate::url::{listing_id, listing_key};
use crate::ConfigError;
use serde::Serialize;

/// Turns a fetched body into `(dedup key, item)` pairs
pub trait PageProcessor: Send + Sync + 'static {
    type Item: Send + 'static;

    fn process(&self, descriptor: &PageDescriptor, body: String) -> Vec<(String, Self::Item)>;
}

/// A listing link found on a search page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundLink {
    /// Search page it was first seen on
    pub page_index: u32,
    /// Strategy that found it
    pub source: String,
}

/// What the crawl needs to know about a search page
#[derive(Debug, Clone)]
pub struct SearchPageSummary {
    pub links: LinkBatch,
    pub next: NextSignal,
}

/// Extracts listing links from search pages
#[derive(Debug, Clone)]
pub struct LinkProcessor {
    sources: PayloadSources,
    links: LinkExtractor,
    next_page: NextPageDetector,
    total: TotalEstimator,
}

impl LinkProcessor {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            sources: PayloadSources::compile(&config.structured_data)?,
            links: LinkExtractor::from_config(&config.links, &config.marketplace.domain)?,
            next_page: NextPageDetector::from_config(&config.next_page)?,
            total: TotalEstimator::from_config(&config.total)?,
        })
    }

    /// Links and "next page" signal of one search page
    pub fn summarize(&self, descriptor: &PageDescriptor, body: String) -> SearchPageSummary {
        let page = PageContent::parse(descriptor.url.clone(), body, &self.sources);
        SearchPageSummary {
            links: self.links.extract(&page),
            next: self.next_page.detect(&page),
        }
    }

    /// Summary plus the result-total estimate, for the first page
    pub fn summarize_first(&self, descriptor: &PageDescriptor, body: String) -> (SearchPageSummary, TotalEstimate) {
        let page = PageContent::parse(descriptor.url.clone(), body, &self.sources);
        let estimate = self.total.estimate(&page);
        let summary = SearchPageSummary {
            links: self.links.extract(&page),
            next: self.next_page.detect(&page),
        };
        (summary, estimate)
    }

    /// Keyed items for a page's links
    pub fn items(descriptor: &PageDescriptor, batch: LinkBatch) -> Vec<(String, FoundLink)> {
        let source = batch.source.unwrap_or_default();
        batch
            .links
            .into_iter()
            .map(|link| {
                (
                    link,
                    FoundLink {
                        page_index: descriptor.page_index,
                        source: source.clone(),
                    },
                )
            })
            .collect()
    }
}

impl PageProcessor for LinkProcessor {
    type Item = FoundLink;

    fn process(&self, descriptor: &PageDescriptor, body: String) -> Vec<(String, FoundLink)> {
        let summary = self.summarize(descriptor, body);
        Self::items(descriptor, summary.links)
    }
}

/// Fields of one listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_link: Option<String>,
    pub fields: ExtractionResult,
    pub missing_required: Vec<String>,
}

impl ListingRecord {
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}

/// Extracts configured fields from listing pages
#[derive(Debug, Clone)]
pub struct ListingProcessor {
    sources: PayloadSources,
    fields: FieldExtractor,
    short_link: Option<String>,
}

impl ListingProcessor {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            sources: PayloadSources::compile(&config.structured_data)?,
            fields: FieldExtractor::from_config(&config.fields)?,
            short_link: config.marketplace.short_link.clone(),
        })
    }

    pub fn record(&self, descriptor: &PageDescriptor, body: String) -> ListingRecord {
        let page = PageContent::parse(descriptor.url.clone(), body, &self.sources);
        let fields = self.fields.extract(&page);
        let missing_required = fields.missing_required(self.fields.specs());

        let id = fields
            .value("listing_id")
            .map(str::to_string)
            .or_else(|| listing_id(descriptor.url.as_str()));
        let short_link = match (&self.short_link, id) {
            (Some(template), Some(id)) => Some(template.replace("{id}", &id)),
            _ => None,
        };

        ListingRecord {
            url: descriptor.url.to_string(),
            short_link,
            fields,
            missing_required,
        }
    }
}

impl PageProcessor for ListingProcessor {
    type Item = ListingRecord;

    fn process(&self, descriptor: &PageDescriptor, body: String) -> Vec<(String, ListingRecord)> {
        let record = self.record(descriptor, body);
        let key = listing_key(&record.url).unwrap_or_else(|_| record.url.clone());
        vec![(key, record)]
    }
}
