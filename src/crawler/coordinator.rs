//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loops:
//! - a bounded worker pool (semaphore permits plus a `JoinSet`) that fetches
//!   and processes a fixed list of pages, merging items into one shared state
//! - link collection: page 1, total estimation, then the planned pages or
//!   incremental pagination
//! - listing scraping, for one listing or a batch of them

use crate::config::{Config, UnknownTotalPolicy};
use crate::crawler::fetcher::{FetchedPage, HttpFetcher, PageFetcher};
use crate::crawler::pagination::{
    plan, Continuation, ContinuationPolicy, PageDescriptor, PaginationPolicy, PlanBasis,
};
use crate::crawler::processor::{FoundLink, LinkProcessor, ListingProcessor, ListingRecord, PageProcessor};
use crate::crawler::progress::{CrawlContext, ProgressEvent};
use crate::extract::{NextSignal, TotalEstimate};
use crate::state::{CrawlState, PageOutcome, SharedCrawlState};
use crate::url::{start_page, validate_marketplace_url};
use crate::{FetchError, SieveError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use url::Url;

/// User overrides for a link crawl
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOverrides {
    /// Exact number of pages to visit
    pub pages: Option<u32>,
}

/// Result of a worker-pool run
#[derive(Debug)]
pub struct RunOutput<T> {
    pub state: CrawlState<T>,
    /// Outcome per page index
    pub outcomes: BTreeMap<u32, PageOutcome>,
}

/// Result of a link crawl
#[derive(Debug)]
pub struct LinkCrawlReport {
    pub start_url: Url,
    pub state: CrawlState<FoundLink>,
    pub estimate: TotalEstimate,
    pub basis: PlanBasis,
    pub outcomes: BTreeMap<u32, PageOutcome>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl LinkCrawlReport {
    /// Deduplicated listing URLs in lexicographic order
    pub fn links(&self) -> Vec<&str> {
        self.state.keys().map(String::as_str).collect()
    }

    pub fn pages_fetched(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_fetched()).count()
    }

    pub fn pages_failed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_error()).count()
    }
}

/// Result of a batch listing scrape
#[derive(Debug)]
pub struct ListingBatchReport {
    pub state: CrawlState<ListingRecord>,
    pub outcomes: BTreeMap<u32, PageOutcome>,
    /// Inputs rejected before any fetch
    pub rejected: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    links: Arc<LinkProcessor>,
    listings: Arc<ListingProcessor>,
    context: CrawlContext,
}

impl Coordinator {
    /// Creates a coordinator fetching over HTTP
    pub fn new(config: Config) -> Result<Self, SieveError> {
        let fetcher = HttpFetcher::new(
            &config.fetch,
            Duration::from_secs(config.crawler.request_timeout_secs),
        )?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Creates a coordinator using the given fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self, SieveError> {
        Ok(Self {
            links: Arc::new(LinkProcessor::from_config(&config)?),
            listings: Arc::new(ListingProcessor::from_config(&config)?),
            config: Arc::new(config),
            fetcher,
            context: CrawlContext::default(),
        })
    }

    /// Replaces the crawl context (span and progress sink)
    pub fn with_context(mut self, context: CrawlContext) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches and processes every descriptor through the bounded pool
    ///
    /// Failed or timed-out pages contribute zero items; they never abort the
    /// run. Completion order is arbitrary; the returned state is not.
    pub async fn run<P: PageProcessor>(
        &self,
        descriptors: Vec<PageDescriptor>,
        processor: Arc<P>,
    ) -> RunOutput<P::Item> {
        let pages_total = descriptors.len();
        self.run_continuing(descriptors, processor, 0, pages_total).await
    }

    /// Same as [`Coordinator::run`], for a crawl that already completed
    /// `pages_done` of `pages_total` pages; progress counts continue from there
    async fn run_continuing<P: PageProcessor>(
        &self,
        descriptors: Vec<PageDescriptor>,
        processor: Arc<P>,
        mut pages_done: usize,
        pages_total: usize,
    ) -> RunOutput<P::Item> {
        let concurrency = self.config.crawler.concurrency.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let shared: SharedCrawlState<P::Item> = SharedCrawlState::default();
        let mut outcomes = BTreeMap::new();

        let mut set: JoinSet<(u32, PageOutcome, usize, usize)> = JoinSet::new();

        for descriptor in descriptors {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let processor = Arc::clone(&processor);
            let shared = shared.clone();
            let delay = self.delay_for(descriptor.page_index);
            let timeout = self.request_timeout();

            set.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    tokio::time::sleep(delay).await;

                    match fetch_with_timeout(fetcher.as_ref(), descriptor.url.as_str(), timeout).await {
                        Ok(page) => {
                            let items = processor.process(&descriptor, page.body);
                            let found = items.len();
                            let (added, total) = shared.merge(items);
                            (descriptor.page_index, PageOutcome::from_items(found), added, total)
                        }
                        Err(e) => {
                            tracing::warn!(page = descriptor.page_index, "Page skipped: {}", e);
                            (descriptor.page_index, PageOutcome::from_error(&e), 0, shared.count())
                        }
                    }
                }
                .instrument(self.context.span.clone()),
            );
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((page_index, outcome, new_keys, total_keys)) => {
                    pages_done += 1;
                    outcomes.insert(page_index, outcome);
                    self.context.sink.on_page(&ProgressEvent {
                        page_index,
                        outcome,
                        new_keys,
                        total_keys,
                        pages_done,
                        pages_total,
                    });
                }
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        RunOutput {
            state: shared.take(),
            outcomes,
        }
    }

    /// Collects listing links from a search URL
    ///
    /// Page 1 is fetched first; its failure aborts the crawl. The rest of the
    /// crawl is sized from the override, the estimated total, or, when the
    /// total is unknown, the configured unknown-total policy.
    pub async fn collect_links(
        &self,
        start_url: &str,
        overrides: LinkOverrides,
    ) -> Result<LinkCrawlReport, SieveError> {
        let started_at = Utc::now();
        let started = Instant::now();
        let base = validate_marketplace_url(start_url, &self.config.marketplace.domain)?;
        let param = &self.config.marketplace.page_param;
        let policy = PaginationPolicy::from_config(&self.config.crawler, param)
            .starting_at(start_page(&base, param));

        tracing::info!(parent: &self.context.span, url = %base, start_page = policy.start_page, "Collecting listing links");

        let first = policy.descriptor(&base, 0);
        let body = fetch_with_timeout(self.fetcher.as_ref(), first.url.as_str(), self.request_timeout())
            .instrument(self.context.span.clone())
            .await?
            .body;
        let (summary, estimate) = self.links.summarize_first(&first, body);

        let mut state = CrawlState::new();
        let mut outcomes = BTreeMap::new();
        let found = summary.links.len();
        let added = state.merge(LinkProcessor::items(&first, summary.links));
        outcomes.insert(first.page_index, PageOutcome::from_items(found));

        let known_total = estimate.count;
        let incremental = overrides.pages.is_none()
            && known_total == 0
            && self.config.crawler.unknown_total == UnknownTotalPolicy::Incremental;

        let basis = if incremental {
            self.emit(first.page_index, outcomes[&first.page_index], added, state.count(), 1, 0);
            self.continue_incrementally(&base, &policy, first.page_index, found, summary.next, &mut state, &mut outcomes)
                .await;
            PlanBasis::Incremental
        } else {
            let plan = plan(&base, known_total, &policy, overrides.pages);
            let pages_total = plan.len().max(1);
            self.emit(first.page_index, outcomes[&first.page_index], added, state.count(), 1, pages_total);
            tracing::info!(parent: &self.context.span, pages = plan.len(), basis = ?plan.basis, "Page plan ready");

            let remaining: Vec<PageDescriptor> = plan.descriptors.into_iter().skip(1).collect();
            let run = self
                .run_continuing(remaining, Arc::clone(&self.links), 1, pages_total)
                .await;
            state.merge(run.state.into_items());
            outcomes.extend(run.outcomes);
            plan.basis
        };

        let report = LinkCrawlReport {
            start_url: base,
            state,
            estimate,
            basis,
            outcomes,
            started_at,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            links = report.state.count(),
            pages = report.outcomes.len(),
            failed = report.pages_failed(),
            "Link collection finished in {:?}",
            report.elapsed
        );

        Ok(report)
    }

    /// Follows pages one at a time until the continuation policy stops
    #[allow(clippy::too_many_arguments)]
    async fn continue_incrementally(
        &self,
        base: &Url,
        policy: &PaginationPolicy,
        first_index: u32,
        first_links: usize,
        first_next: NextSignal,
        state: &mut CrawlState<FoundLink>,
        outcomes: &mut BTreeMap<u32, PageOutcome>,
    ) {
        let continuation = ContinuationPolicy::from_config(&self.config.crawler);
        let mut page_index = first_index;
        let mut links_found = first_links;
        let mut next = first_next;

        loop {
            match continuation.decide(page_index, links_found, next) {
                Continuation::Continue => {}
                Continuation::Stop(reason) => {
                    tracing::info!(page = page_index, ?reason, "Pagination stopped");
                    break;
                }
            }

            let descriptor = policy.descriptor(base, page_index + 1 - policy.start_page);
            page_index = descriptor.page_index;
            tokio::time::sleep(self.delay_for(0)).await;

            let fetched = fetch_with_timeout(
                self.fetcher.as_ref(),
                descriptor.url.as_str(),
                self.request_timeout(),
            )
            .instrument(self.context.span.clone())
            .await;

            match fetched {
                Ok(page) => {
                    let summary = self.links.summarize(&descriptor, page.body);
                    links_found = summary.links.len();
                    next = summary.next;
                    let added = state.merge(LinkProcessor::items(&descriptor, summary.links));
                    let outcome = PageOutcome::from_items(links_found);
                    outcomes.insert(page_index, outcome);
                    self.emit(page_index, outcome, added, state.count(), outcomes.len(), 0);
                }
                Err(e) => {
                    tracing::warn!(page = page_index, "Page skipped, stopping pagination: {}", e);
                    let outcome = PageOutcome::from_error(&e);
                    outcomes.insert(page_index, outcome);
                    self.emit(page_index, outcome, 0, state.count(), outcomes.len(), 0);
                    break;
                }
            }
        }
    }

    /// Scrapes one listing page
    ///
    /// A fetch failure is fatal here; missing fields are not.
    pub async fn scrape_listing(&self, url: &str) -> Result<ListingRecord, SieveError> {
        let url = validate_marketplace_url(url, &self.config.marketplace.domain)?;
        let descriptor = PageDescriptor { url, page_index: 1 };

        let page = fetch_with_timeout(self.fetcher.as_ref(), descriptor.url.as_str(), self.request_timeout())
            .instrument(self.context.span.clone())
            .await?;
        let record = self.listings.record(&descriptor, page.body);

        if !record.missing_required.is_empty() {
            tracing::warn!(
                url = %record.url,
                missing = ?record.missing_required,
                "Required fields not found"
            );
        }

        Ok(record)
    }

    /// Scrapes many listing pages through the worker pool
    ///
    /// Inputs that are not marketplace URLs are reported, not fetched.
    pub async fn scrape_listings(&self, urls: &[String]) -> ListingBatchReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut rejected = Vec::new();
        let mut descriptors = Vec::new();

        for raw in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            match validate_marketplace_url(raw, &self.config.marketplace.domain) {
                Ok(url) => descriptors.push(PageDescriptor {
                    url,
                    page_index: descriptors.len() as u32 + 1,
                }),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", raw, e);
                    rejected.push(raw.to_string());
                }
            }
        }

        tracing::info!(listings = descriptors.len(), "Scraping listings");
        let run = self.run(descriptors, Arc::clone(&self.listings)).await;

        ListingBatchReport {
            state: run.state,
            outcomes: run.outcomes,
            rejected,
            started_at,
            elapsed: started.elapsed(),
        }
    }

    /// Fixed delay plus a jitter step scaled by the page's worker slot
    fn delay_for(&self, page_index: u32) -> Duration {
        let crawler = &self.config.crawler;
        let slot = u64::from(page_index % crawler.concurrency.max(1));
        Duration::from_millis(crawler.request_delay_ms + crawler.jitter_ms * slot)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.crawler.request_timeout_secs)
    }

    fn emit(
        &self,
        page_index: u32,
        outcome: PageOutcome,
        new_keys: usize,
        total_keys: usize,
        pages_done: usize,
        pages_total: usize,
    ) {
        self.context.sink.on_page(&ProgressEvent {
            page_index,
            outcome,
            new_keys,
            total_keys,
            pages_done,
            pages_total,
        });
    }
}

/// Fetches with a hard per-request deadline; running out of time is a
/// `FetchError::Timeout`
async fn fetch_with_timeout(
    fetcher: &dyn PageFetcher,
    url: &str,
    timeout: Duration,
) -> Result<FetchedPage, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Serves canned bodies; unknown URLs fail
    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            match self.pages.get(url) {
                Some(body) => Ok(FetchedPage {
                    final_url: url.to_string(),
                    status_code: 200,
                    body: body.clone(),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn test_config() -> Config {
        let mut config = Config::builtin().unwrap();
        config.crawler.request_delay_ms = 0;
        config.crawler.jitter_ms = 0;
        config.crawler.concurrency = 3;
        config
    }

    fn search_page(ids: std::ops::Range<u64>, extra: &str) -> String {
        let anchors: String = ids
            .map(|id| format!(r#"<a href="/autos/carro-{}">Carro</a>"#, 10_000_000_000u64 + id))
            .collect();
        format!("<html><body>{}{}</body></html>", extra, anchors)
    }

    fn coordinator(pages: Vec<(&str, String)>) -> Coordinator {
        let fetcher = StaticFetcher {
            pages: pages.into_iter().map(|(u, b)| (u.to_string(), b)).collect(),
        };
        Coordinator::with_fetcher(test_config(), Arc::new(fetcher)).unwrap()
    }

    #[test]
    fn test_delay_scales_with_slot() {
        let mut config = test_config();
        config.crawler.request_delay_ms = 100;
        config.crawler.jitter_ms = 10;
        let c = Coordinator::with_fetcher(
            config,
            Arc::new(StaticFetcher {
                pages: HashMap::new(),
            }),
        )
        .unwrap();
        assert_eq!(c.delay_for(3), Duration::from_millis(100));
        assert_eq!(c.delay_for(4), Duration::from_millis(110));
        assert_eq!(c.delay_for(5), Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_planned_crawl_merges_pages() {
        let c = coordinator(vec![
            ("https://sp.olx.com.br/autos", search_page(0..50, "<p>120 resultados</p>")),
            ("https://sp.olx.com.br/autos?o=2", search_page(50..100, "")),
            ("https://sp.olx.com.br/autos?o=3", search_page(100..120, "")),
        ]);
        let report = c
            .collect_links("https://sp.olx.com.br/autos", LinkOverrides::default())
            .await
            .unwrap();

        assert_eq!(report.estimate.count, 120);
        assert_eq!(report.basis, PlanBasis::Estimated { total: 120 });
        assert_eq!(report.state.count(), 120);
        assert_eq!(report.pages_fetched(), 3);
        assert_eq!(report.pages_failed(), 0);
        let links = report.links();
        let mut sorted = links.clone();
        sorted.sort();
        assert_eq!(links, sorted);
    }

    #[tokio::test]
    async fn test_later_page_failure_degrades() {
        let c = coordinator(vec![
            ("https://sp.olx.com.br/autos", search_page(0..50, "<p>150 resultados</p>")),
            ("https://sp.olx.com.br/autos?o=3", search_page(100..150, "")),
        ]);
        let report = c
            .collect_links("https://sp.olx.com.br/autos", LinkOverrides::default())
            .await
            .unwrap();
        assert_eq!(report.state.count(), 100);
        assert_eq!(report.outcomes[&2], PageOutcome::FetchFailed);
        assert_eq!(report.pages_failed(), 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal() {
        let c = coordinator(vec![]);
        let err = c
            .collect_links("https://sp.olx.com.br/autos", LinkOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SieveError::Fetch(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_foreign_url_rejected_before_fetch() {
        let c = coordinator(vec![]);
        let err = c
            .collect_links("https://example.com/autos", LinkOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SieveError::Url(_)));
    }

    #[tokio::test]
    async fn test_incremental_stops_on_empty_page() {
        let next = r#"<a href="?o=2">Próxima página</a>"#;
        let c = coordinator(vec![
            ("https://sp.olx.com.br/autos", search_page(0..5, next)),
            ("https://sp.olx.com.br/autos?o=2", search_page(5..8, next)),
            ("https://sp.olx.com.br/autos?o=3", search_page(0..0, next)),
            ("https://sp.olx.com.br/autos?o=4", search_page(8..20, next)),
        ]);
        let report = c
            .collect_links("https://sp.olx.com.br/autos", LinkOverrides::default())
            .await
            .unwrap();
        assert!(!report.estimate.is_known());
        assert_eq!(report.basis, PlanBasis::Incremental);
        assert_eq!(report.state.count(), 8);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcomes[&3], PageOutcome::Empty);
    }

    #[tokio::test]
    async fn test_override_sets_page_count() {
        let c = coordinator(vec![
            ("https://sp.olx.com.br/autos", search_page(0..5, "<p>900 resultados</p>")),
            ("https://sp.olx.com.br/autos?o=2", search_page(5..10, "")),
        ]);
        let report = c
            .collect_links("https://sp.olx.com.br/autos", LinkOverrides { pages: Some(2) })
            .await
            .unwrap();
        assert_eq!(report.basis, PlanBasis::Override);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.state.count(), 10);
    }

    #[tokio::test]
    async fn test_scrape_listings_batch() {
        let body = r#"<html><body><h1>Gol</h1><h2 class="olx-text--title-large">R$ 30.000</h2></body></html>"#;
        let c = coordinator(vec![
            ("https://sp.olx.com.br/autos/gol-1234567890", body.to_string()),
        ]);
        let urls = vec![
            "https://sp.olx.com.br/autos/gol-1234567890".to_string(),
            "https://sp.olx.com.br/autos/gol-1234567890/".to_string(),
            "https://example.com/x-1234567890".to_string(),
            "https://sp.olx.com.br/autos/missing-9999999999".to_string(),
        ];
        let report = c.scrape_listings(&urls).await;
        assert_eq!(report.rejected, vec!["https://example.com/x-1234567890"]);
        assert_eq!(report.state.count(), 1);
        assert_eq!(report.outcomes.len(), 3);
        let record = report.state.get("https://sp.olx.com.br/autos/gol-1234567890").unwrap();
        assert_eq!(record.fields.value("price"), Some("R$ 30.000"));
    }
}
