//! Crawl statistics
//!
//! Summarizes the page outcomes of a finished crawl for the console.

use crate::state::PageOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlStatistics {
    /// Pages dispatched
    pub total_pages: usize,

    /// Count of pages by outcome
    pub pages_by_outcome: BTreeMap<&'static str, usize>,

    /// Items before deduplication
    pub items_found: usize,

    /// Unique items after deduplication
    pub unique_items: usize,

    /// Pages that could not be fetched, in page order
    pub failed_pages: Vec<u32>,

    pub started_at: DateTime<Utc>,

    pub elapsed_secs: f64,
}

impl CrawlStatistics {
    /// Builds statistics from per-page outcomes
    pub fn from_outcomes(
        outcomes: &BTreeMap<u32, PageOutcome>,
        unique_items: usize,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let mut pages_by_outcome = BTreeMap::new();
        for outcome in outcomes.values() {
            *pages_by_outcome.entry(outcome.as_str()).or_insert(0) += 1;
        }

        Self {
            total_pages: outcomes.len(),
            pages_by_outcome,
            items_found: outcomes.values().map(PageOutcome::items).sum(),
            unique_items,
            failed_pages: outcomes
                .iter()
                .filter(|(_, o)| o.is_error())
                .map(|(page, _)| *page)
                .collect(),
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.total_pages - self.failed_pages.len()
    }

    /// Share of dispatched pages that were fetched, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            self.pages_fetched() as f64 / self.total_pages as f64 * 100.0
        }
    }
}

/// Formats statistics for the console
pub fn format_statistics(stats: &CrawlStatistics, item_label: &str) -> String {
    let mut out = String::new();
    out.push_str("=== Crawl Summary ===\n");
    out.push_str(&format!("  Unique {}: {}\n", item_label, stats.unique_items));
    out.push_str(&format!(
        "  Found before dedup: {}\n",
        stats.items_found
    ));
    out.push_str(&format!(
        "  Pages fetched: {} / {} ({:.1}%)\n",
        stats.pages_fetched(),
        stats.total_pages,
        stats.success_rate()
    ));

    for (outcome, count) in &stats.pages_by_outcome {
        out.push_str(&format!("    {}: {}\n", outcome, count));
    }

    if !stats.failed_pages.is_empty() {
        let pages: Vec<String> = stats.failed_pages.iter().map(u32::to_string).collect();
        out.push_str(&format!("  Failed pages: {}\n", pages.join(", ")));
    }

    out.push_str(&format!(
        "  Started: {}, elapsed {:.2}s\n",
        stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        stats.elapsed_secs
    ));
    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics, item_label: &str) {
    print!("{}", format_statistics(stats, item_label));
}
