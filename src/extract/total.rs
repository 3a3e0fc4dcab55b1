//! Result-count estimation
//!
//! Runs once, on the first search page, to size the crawl. Signals are tried
//! from the most to the least structured and the first one that yields a count
//! wins:
//!
//! 1. count-like keys in embedded JSON (first positive number)
//! 2. "number + result word" in the visible text ("1.240 resultados")
//! 3. a pagination phrase, "N of M" after a showing-word or a range
//!    ("Mostrando 50 de 1.240", "1 - 50 de 1.240"), whose last number is the
//!    total
//! 4. the same phrase as (2) in the meta description or the title
//! 5. internal count fields in the raw markup (`"totalOfAds": 1240`), ignoring
//!    values at or below the plausibility floor

use crate::config::TotalConfig;
use crate::extract::json_search::{self, parse_count, positive_count};
use crate::extract::page::{collapse_whitespace, PageContent};
use crate::extract::{compile_regex, compile_selector};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use serde::Serialize;

/// Depth searched for count keys in each payload
const COUNT_SEARCH_DEPTH: usize = 8;

const NUMBER: &str = r"(\d{1,3}(?:[.,]\d{3})+|\d+)";

/// Estimated number of results; `count == 0` means undetermined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TotalEstimate {
    pub count: u64,
    /// Signal that produced the count
    pub source: Option<&'static str>,
}

impl TotalEstimate {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.count > 0
    }

    fn found(count: u64, source: &'static str) -> Self {
        Self {
            count,
            source: Some(source),
        }
    }
}

/// Five-signal result-count estimator
#[derive(Debug, Clone)]
pub struct TotalEstimator {
    count_keys: Vec<String>,
    phrase: Option<Regex>,
    range: Regex,
    raw_field: Option<Regex>,
    min_plausible: u64,
    description: Selector,
    title: Selector,
}

impl TotalEstimator {
    pub fn from_config(config: &TotalConfig) -> Result<Self, ConfigError> {
        let phrase = if config.result_words.is_empty() {
            None
        } else {
            let words: Vec<String> = config.result_words.iter().map(|w| regex::escape(w)).collect();
            Some(compile_regex(&format!(
                r"(?i){}\s+(?:{})\b",
                NUMBER,
                words.join("|")
            ))?)
        };

        let raw_field = if config.raw_fields.is_empty() {
            None
        } else {
            let fields: Vec<String> = config.raw_fields.iter().map(|f| regex::escape(f)).collect();
            Some(compile_regex(&format!(
                r#""(?:{})"\s*:\s*"?(\d+)"#,
                fields.join("|")
            ))?)
        };

        Ok(Self {
            count_keys: config.count_keys.clone(),
            phrase,
            range: compile_regex(&format!(
                r"(?i)(?:\d[\d.,]*\s*[-–]\s*\d[\d.,]*|\b(?:mostrando|exibindo|showing|displaying|viewing)\s+\d[\d.,]*)\s+(?:de|of|out of)\s+{}",
                NUMBER
            ))?,
            raw_field,
            min_plausible: config.min_plausible,
            description: compile_selector(
                r#"meta[name="description"], meta[property="og:description"]"#,
            )?,
            title: compile_selector("title")?,
        })
    }

    pub fn estimate(&self, page: &PageContent) -> TotalEstimate {
        let estimate = self
            .from_payloads(page)
            .map(|n| TotalEstimate::found(n, "json"))
            .or_else(|| self.from_phrase(page.text()).map(|n| TotalEstimate::found(n, "text")))
            .or_else(|| first_number(&self.range, page.text()).map(|n| TotalEstimate::found(n, "range")))
            .or_else(|| self.from_meta(page).map(|n| TotalEstimate::found(n, "meta")))
            .or_else(|| self.from_raw(page.raw()).map(|n| TotalEstimate::found(n, "raw")))
            .unwrap_or_default();

        match estimate.source {
            Some(source) => tracing::info!(total = estimate.count, source, "Result total estimated"),
            None => tracing::warn!("Could not determine the result total"),
        }

        estimate
    }

    fn from_payloads(&self, page: &PageContent) -> Option<u64> {
        if self.count_keys.is_empty() {
            return None;
        }
        page.payloads().iter().find_map(|payload| {
            json_search::find_map(&payload.value, &self.count_keys, COUNT_SEARCH_DEPTH, positive_count)
        })
    }

    fn from_phrase(&self, text: &str) -> Option<u64> {
        self.phrase.as_ref().and_then(|re| first_number(re, text))
    }

    fn from_meta(&self, page: &PageContent) -> Option<u64> {
        let descriptions = page
            .document()
            .select(&self.description)
            .filter_map(|e| e.value().attr("content").map(collapse_whitespace));
        let titles = page
            .document()
            .select(&self.title)
            .map(|e| collapse_whitespace(&e.text().collect::<String>()));

        descriptions
            .chain(titles)
            .find_map(|text| self.from_phrase(&text))
    }

    fn from_raw(&self, raw: &str) -> Option<u64> {
        let re = self.raw_field.as_ref()?;
        re.captures_iter(raw)
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| m.as_str().parse::<u64>().ok())
            .find(|n| *n > self.min_plausible)
    }
}

fn first_number(re: &Regex, text: &str) -> Option<u64> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| parse_count(m.as_str()))
        .find(|n| *n > 0)
}
