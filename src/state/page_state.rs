/// Per-page outcome definitions for the crawl summary
use crate::FetchError;
use serde::Serialize;
use std::fmt;

/// Terminal outcome of one dispatched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "items")]
pub enum PageOutcome {
    /// Page was fetched and yielded this many items
    Extracted(usize),

    /// Page was fetched but yielded nothing
    Empty,

    // ===== Failure States =====
    /// Network failure or non-success HTTP status
    FetchFailed,

    /// Fetch did not finish within the per-request timeout
    TimedOut,
}

impl PageOutcome {
    /// Outcome for a page that was fetched and processed
    pub fn from_items(count: usize) -> Self {
        if count == 0 {
            Self::Empty
        } else {
            Self::Extracted(count)
        }
    }

    /// Outcome for a page whose fetch failed
    pub fn from_error(error: &FetchError) -> Self {
        if error.is_timeout() {
            Self::TimedOut
        } else {
            Self::FetchFailed
        }
    }

    /// Returns true if the page was fetched, whatever it contained
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Extracted(_) | Self::Empty)
    }

    /// Returns true if the page could not be fetched
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::TimedOut)
    }

    /// Items the page contributed before deduplication
    pub fn items(&self) -> usize {
        match self {
            Self::Extracted(n) => *n,
            _ => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted(_) => "extracted",
            Self::Empty => "empty",
            Self::FetchFailed => "fetch_failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted(n) => write!(f, "{} ({})", self.as_str(), n),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}
