//! Output module for crawl results
//!
//! This module handles:
//! - Writing and reading newline-delimited link files
//! - Rendering listing records as a field table or JSON
//! - Summarizing crawl statistics

mod links;
mod listing;
pub mod stats;

pub use links::{read_links, write_links, DEFAULT_LINKS_FILE};
pub use listing::{render_listing, render_listing_json};
pub use stats::{format_statistics, print_statistics, CrawlStatistics};

use crate::crawler::{LinkCrawlReport, ListingBatchReport};

impl LinkCrawlReport {
    pub fn statistics(&self) -> CrawlStatistics {
        CrawlStatistics::from_outcomes(&self.outcomes, self.state.count(), self.started_at, self.elapsed)
    }
}

impl ListingBatchReport {
    pub fn statistics(&self) -> CrawlStatistics {
        CrawlStatistics::from_outcomes(&self.outcomes, self.state.count(), self.started_at, self.elapsed)
    }
}
