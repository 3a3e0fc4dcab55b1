//! Deduplicated crawl results
//!
//! `CrawlState` is a set keyed by the deduplication key (listing URL or id).
//! It only grows, and only through [`CrawlState::merge`]; the final contents
//! do not depend on the order in which pages complete.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Ordered map from dedup key to item
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CrawlState<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for CrawlState<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T> CrawlState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set union with `items`
    ///
    /// A key already present keeps its first item. Returns how many keys were
    /// new.
    pub fn merge(&mut self, items: impl IntoIterator<Item = (String, T)>) -> usize {
        let mut added = 0;
        for (key, item) in items {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.items.entry(key) {
                slot.insert(item);
                added += 1;
            }
        }
        added
    }

    /// Number of distinct keys ever merged
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.get(key)
    }

    /// Keys in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    /// Entries in lexicographic key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.items.iter()
    }

    pub fn into_items(self) -> BTreeMap<String, T> {
        self.items
    }
}

/// A `CrawlState` shared between workers
///
/// The lock is held only for the duration of one merge.
#[derive(Debug)]
pub struct SharedCrawlState<T> {
    inner: Arc<Mutex<CrawlState<T>>>,
}

impl<T> Clone for SharedCrawlState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SharedCrawlState<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CrawlState::default())),
        }
    }
}

impl<T> SharedCrawlState<T> {
    /// Merges `items`; returns (new keys, total keys)
    pub fn merge(&self, items: impl IntoIterator<Item = (String, T)>) -> (usize, usize) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let added = state.merge(items);
        (added, state.count())
    }

    pub fn count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count()
    }

    /// Takes the accumulated state, leaving an empty one behind
    pub fn take(&self) -> CrawlState<T> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
