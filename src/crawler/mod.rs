//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the crawling logic, including:
//! - HTTP fetching behind the [`PageFetcher`] trait
//! - Page planning and incremental continuation
//! - Page processors turning bodies into keyed items
//! - The bounded worker pool and the link/listing crawl modes

mod coordinator;
mod fetcher;
mod pagination;
mod processor;
mod progress;

pub use coordinator::{Coordinator, LinkCrawlReport, LinkOverrides, ListingBatchReport, RunOutput};
pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, PageFetcher};
pub use pagination::{
    plan, Continuation, ContinuationPolicy, PageDescriptor, PagePlan, PaginationPolicy, PlanBasis,
    StopReason,
};
pub use processor::{
    FoundLink, LinkProcessor, ListingProcessor, ListingRecord, PageProcessor, SearchPageSummary,
};
pub use progress::{CrawlContext, ProgressEvent, ProgressSink, TracingSink};
