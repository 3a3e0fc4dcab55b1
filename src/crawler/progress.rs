//! Crawl-scoped progress reporting
//!
//! Each crawl carries a [`CrawlContext`]: the tracing span its workers run in
//! and the sink that receives one [`ProgressEvent`] per completed page.

use crate::state::PageOutcome;
use std::sync::Arc;

/// Emitted once per completed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub page_index: u32,
    pub outcome: PageOutcome,
    /// Keys this page added to the crawl state
    pub new_keys: usize,
    /// Keys in the crawl state after this page
    pub total_keys: usize,
    pub pages_done: usize,
    pub pages_total: usize,
}

/// Receives progress events
pub trait ProgressSink: Send + Sync {
    fn on_page(&self, event: &ProgressEvent);
}

/// Logs progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_page(&self, event: &ProgressEvent) {
        tracing::info!(
            page = event.page_index,
            outcome = %event.outcome,
            new = event.new_keys,
            total = event.total_keys,
            "Progress: {}/{} pages",
            event.pages_done,
            event.pages_total
        );
    }
}

/// Per-crawl context handed to the coordinator
#[derive(Clone)]
pub struct CrawlContext {
    pub span: tracing::Span,
    pub sink: Arc<dyn ProgressSink>,
}

impl CrawlContext {
    pub fn new(span: tracing::Span, sink: Arc<dyn ProgressSink>) -> Self {
        Self { span, sink }
    }
}

impl Default for CrawlContext {
    fn default() -> Self {
        Self {
            span: tracing::info_span!("crawl"),
            sink: Arc::new(TracingSink),
        }
    }
}

impl std::fmt::Debug for CrawlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlContext")
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressSink for Recorder {
        fn on_page(&self, event: &ProgressEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_custom_sink_receives_events() {
        let recorder = Arc::new(Recorder::default());
        let context = CrawlContext::new(tracing::Span::none(), recorder.clone());
        let event = ProgressEvent {
            page_index: 2,
            outcome: PageOutcome::Extracted(50),
            new_keys: 48,
            total_keys: 98,
            pages_done: 2,
            pages_total: 3,
        };
        context.sink.on_page(&event);
        TracingSink.on_page(&event);
        assert_eq!(recorder.0.lock().unwrap().as_slice(), &[event]);
    }
}
