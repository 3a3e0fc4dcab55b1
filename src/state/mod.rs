//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the deduplicated result set of one crawl
//! - `SharedCrawlState`: the same set behind a lock, shared by workers
//! - `PageOutcome`: terminal outcome of each dispatched page

mod crawl_state;
mod page_state;

// Re-export main types
pub use crawl_state::{CrawlState, SharedCrawlState};
pub use page_state::PageOutcome;
