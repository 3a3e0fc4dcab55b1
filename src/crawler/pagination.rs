//! Pagination planning
//!
//! This module decides which result pages a link crawl visits:
//! - [`plan`] sizes the crawl up front from an override or an estimated total
//! - [`ContinuationPolicy`] decides page by page whether to keep going when
//!   the total is unknown

use crate::config::CrawlerConfig;
use crate::extract::NextSignal;
use crate::url::page_url;
use serde::Serialize;
use url::Url;

/// One result page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub url: Url,
    /// Page number as the marketplace counts it
    pub page_index: u32,
}

/// Why a plan has the size it has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "basis")]
pub enum PlanBasis {
    /// Page count given by the user
    Override,
    /// Derived from an estimated result total
    Estimated { total: u64 },
    /// Total unknown; fixed fallback page count
    Fallback,
    /// Total unknown; pages followed one at a time
    Incremental,
}

/// Pages to visit, in page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub descriptors: Vec<PageDescriptor>,
    pub basis: PlanBasis,
}

impl PagePlan {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Pagination parameters
#[derive(Debug, Clone)]
pub struct PaginationPolicy {
    pub per_page: u32,
    pub safety_cap: u32,
    pub fallback_pages: u32,
    pub page_param: String,
    /// Page the crawl starts on
    pub start_page: u32,
}

impl PaginationPolicy {
    pub fn from_config(config: &CrawlerConfig, page_param: &str) -> Self {
        Self {
            per_page: config.per_page,
            safety_cap: config.safety_cap,
            fallback_pages: config.fallback_pages,
            page_param: page_param.to_string(),
            start_page: 1,
        }
    }

    pub fn starting_at(mut self, start_page: u32) -> Self {
        self.start_page = start_page.max(1);
        self
    }

    /// Descriptor for the page `offset` pages after the start page
    pub fn descriptor(&self, base: &Url, offset: u32) -> PageDescriptor {
        let page_index = self.start_page + offset;
        PageDescriptor {
            url: page_url(base, &self.page_param, self.start_page, page_index),
            page_index,
        }
    }
}

/// Builds the page plan
///
/// Pages are numbered from the policy's start page:
/// - an override gives exactly that many pages (not clamped)
/// - a known total covers pages up to `ceil(total / per_page)`, never past
///   the safety cap
/// - otherwise the fallback page count is used, also bounded by the cap
///
/// A start page already past the last page yields an empty plan.
///
/// # Example
///
/// ```
/// use sumi_sieve::crawler::{plan, PaginationPolicy, PlanBasis};
/// use url::Url;
///
/// let policy = PaginationPolicy {
///     per_page: 50,
///     safety_cap: 100,
///     fallback_pages: 5,
///     page_param: "o".to_string(),
///     start_page: 1,
/// };
/// let base = Url::parse("https://sp.olx.com.br/autos").unwrap();
/// let plan = plan(&base, 1240, &policy, None);
/// assert_eq!(plan.len(), 25);
/// assert_eq!(plan.basis, PlanBasis::Estimated { total: 1240 });
/// ```
pub fn plan(base: &Url, known_total: u64, policy: &PaginationPolicy, user_override: Option<u32>) -> PagePlan {
    let start = policy.start_page;
    let (last_page, basis) = match user_override {
        Some(pages) => (u64::from(start) + u64::from(pages) - 1, PlanBasis::Override),
        None if known_total > 0 => {
            let per_page = u64::from(policy.per_page.max(1));
            let needed = (known_total + per_page - 1) / per_page;
            if needed > u64::from(policy.safety_cap) {
                tracing::warn!(
                    needed,
                    cap = policy.safety_cap,
                    "Page count clamped to the safety cap"
                );
            }
            (
                needed.min(u64::from(policy.safety_cap)),
                PlanBasis::Estimated { total: known_total },
            )
        }
        None => {
            tracing::warn!(
                pages = policy.fallback_pages,
                "Result total not detected, using fallback page count"
            );
            let last = u64::from(start) + u64::from(policy.fallback_pages) - 1;
            (last.min(u64::from(policy.safety_cap)), PlanBasis::Fallback)
        }
    };

    let pages = last_page.saturating_add(1).saturating_sub(u64::from(start)) as u32;
    if pages == 0 {
        tracing::warn!(start_page = start, last_page, "Start page is past the last result page");
    }

    PagePlan {
        descriptors: (0..pages).map(|offset| policy.descriptor(base, offset)).collect(),
        basis,
    }
}

/// Whether incremental pagination moves on to the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Stop(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoLinks,
    PageLimit,
    NoNextPage,
}

/// Decides page by page whether a crawl with an unknown total continues
#[derive(Debug, Clone, Copy)]
pub struct ContinuationPolicy {
    /// Last page number that may be visited
    pub max_pages: u32,
    /// Links on a page that imply more pages exist even without a "next" link
    pub min_results: usize,
}

impl ContinuationPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            min_results: config.min_results,
        }
    }

    /// Decision after page `page_index` produced `links_found` links
    ///
    /// Checked in order: zero links stop, the page limit stops, a "next"
    /// affordance continues, a full-looking page continues, anything else
    /// stops.
    pub fn decide(&self, page_index: u32, links_found: usize, next_signal: NextSignal) -> Continuation {
        if links_found == 0 {
            return Continuation::Stop(StopReason::NoLinks);
        }
        if page_index >= self.max_pages {
            return Continuation::Stop(StopReason::PageLimit);
        }
        if next_signal.is_present() {
            return Continuation::Continue;
        }
        if links_found >= self.min_results {
            return Continuation::Continue;
        }
        Continuation::Stop(StopReason::NoNextPage)
    }
}
