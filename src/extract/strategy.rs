//! Compiled extraction strategies
//!
//! A strategy is a pure lookup over a [`PageContent`]: it returns zero or more
//! raw candidates in document order and never fails. Strategies are compiled
//! once from the configuration and shared read-only across workers.

use crate::config::{StrategyConfig, StrategyKindConfig, TextSource};
use crate::extract::json_search::{self, scalar_text};
use crate::extract::page::{collapse_whitespace, PageContent};
use crate::extract::{compile_regex, compile_selector};
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Selector};

/// The closed set of lookups a strategy can perform
#[derive(Debug, Clone)]
pub enum StrategyKind {
    StructuredData {
        keys: Vec<String>,
        within: Vec<String>,
        properties: Vec<String>,
        max_depth: usize,
    },
    Selector {
        selector: Selector,
        attribute: Option<String>,
        label: Option<String>,
        pattern: Option<Regex>,
        first_text: bool,
    },
    LabeledValue {
        label: String,
    },
    Meta {
        lookups: Vec<MetaLookup>,
        pattern: Option<Regex>,
    },
    Pattern {
        regex: Regex,
        source: TextSource,
        min_value: Option<u64>,
    },
    UrlPattern {
        regex: Regex,
        slug: bool,
    },
}

/// One `<meta>` name, or the document title
#[derive(Debug, Clone)]
pub enum MetaLookup {
    Title(Selector),
    Named(Selector),
}

/// A named, ranked strategy
#[derive(Debug, Clone)]
pub struct Strategy {
    /// Provenance tag
    pub name: String,
    pub rank: u32,
    pub kind: StrategyKind,
}

impl Strategy {
    /// Compiles one strategy-table entry
    ///
    /// `position` is the entry's index in its table and is the rank used when
    /// the entry doesn't set one.
    pub fn compile(config: &StrategyConfig, position: usize) -> Result<Self, ConfigError> {
        let kind = match &config.kind {
            StrategyKindConfig::StructuredData {
                keys,
                within,
                properties,
                max_depth,
            } => StrategyKind::StructuredData {
                keys: keys.clone(),
                within: within.clone(),
                properties: properties.clone(),
                max_depth: *max_depth,
            },
            StrategyKindConfig::Selector {
                selector,
                attribute,
                label,
                pattern,
                first_text,
            } => StrategyKind::Selector {
                selector: compile_selector(selector)?,
                attribute: attribute.clone(),
                label: label.as_ref().map(|l| l.to_lowercase()),
                pattern: pattern.as_deref().map(compile_regex).transpose()?,
                first_text: *first_text,
            },
            StrategyKindConfig::LabeledValue { label } => StrategyKind::LabeledValue {
                label: label.trim().to_lowercase(),
            },
            StrategyKindConfig::Meta { names, pattern } => StrategyKind::Meta {
                lookups: names
                    .iter()
                    .map(|name| {
                        if name.eq_ignore_ascii_case("title") {
                            compile_selector("title").map(MetaLookup::Title)
                        } else {
                            compile_selector(&format!(
                                r#"meta[name="{0}"], meta[property="{0}"]"#,
                                name
                            ))
                            .map(MetaLookup::Named)
                        }
                    })
                    .collect::<Result<_, _>>()?,
                pattern: pattern.as_deref().map(compile_regex).transpose()?,
            },
            StrategyKindConfig::Pattern {
                pattern,
                source,
                min_value,
            } => StrategyKind::Pattern {
                regex: compile_regex(pattern)?,
                source: *source,
                min_value: *min_value,
            },
            StrategyKindConfig::UrlPattern { pattern, slug } => StrategyKind::UrlPattern {
                regex: compile_regex(pattern)?,
                slug: *slug,
            },
        };

        Ok(Self {
            name: config.name.clone(),
            rank: config.rank.unwrap_or(position as u32),
            kind,
        })
    }

    /// Raw candidates in document order
    pub fn candidates(&self, page: &PageContent) -> Vec<String> {
        match &self.kind {
            StrategyKind::StructuredData {
                keys,
                within,
                properties,
                max_depth,
            } => structured_candidates(page, keys, within, properties, *max_depth),
            StrategyKind::Selector {
                selector,
                attribute,
                label,
                pattern,
                first_text,
            } => selector_candidates(
                page,
                selector,
                attribute.as_deref(),
                label.as_deref(),
                pattern.as_ref(),
                *first_text,
            ),
            StrategyKind::LabeledValue { label } => labeled_candidates(page, label),
            StrategyKind::Meta { lookups, pattern } => meta_candidates(page, lookups, pattern.as_ref()),
            StrategyKind::Pattern {
                regex,
                source,
                min_value,
            } => {
                let haystack = match source {
                    TextSource::Text => page.text(),
                    TextSource::Raw => page.raw(),
                };
                regex_matches(regex, haystack)
                    .into_iter()
                    .filter(|c| match min_value {
                        Some(min) => json_search::parse_count(c).map_or(false, |n| n >= *min),
                        None => true,
                    })
                    .collect()
            }
            StrategyKind::UrlPattern { regex, slug } => regex_matches(regex, page.url().as_str())
                .into_iter()
                .map(|c| if *slug { c.replace('-', " ") } else { c })
                .collect(),
        }
    }
}

/// Strategies of one table, sorted by rank
///
/// The sort is stable, so entries sharing a rank keep their table order.
#[derive(Debug, Clone, Default)]
pub struct StrategyChain {
    strategies: Vec<Strategy>,
}

impl StrategyChain {
    /// Compiles a strategy table
    pub fn compile(configs: &[StrategyConfig]) -> Result<Self, ConfigError> {
        let mut strategies = configs
            .iter()
            .enumerate()
            .map(|(position, config)| Strategy::compile(config, position))
            .collect::<Result<Vec<_>, _>>()?;
        strategies.sort_by_key(|s| s.rank);
        Ok(Self { strategies })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn structured_candidates(
    page: &PageContent,
    keys: &[String],
    within: &[String],
    properties: &[String],
    max_depth: usize,
) -> Vec<String> {
    let mut candidates = Vec::new();

    for payload in page.payloads() {
        let scopes = if within.is_empty() {
            vec![&payload.value]
        } else {
            json_search::find_containers(&payload.value, within)
        };

        for scope in scopes {
            candidates.extend(
                json_search::find_all(scope, keys, max_depth)
                    .into_iter()
                    .filter_map(scalar_text),
            );
            if !properties.is_empty() {
                candidates.extend(
                    json_search::property_values(scope, properties, max_depth)
                        .into_iter()
                        .filter_map(scalar_text),
                );
            }
        }
    }

    candidates
}

fn selector_candidates(
    page: &PageContent,
    selector: &Selector,
    attribute: Option<&str>,
    label: Option<&str>,
    pattern: Option<&Regex>,
    first_text: bool,
) -> Vec<String> {
    let mut candidates = Vec::new();

    for element in page.document().select(selector) {
        if let Some(label) = label {
            if !element_or_parent_mentions(element, label) {
                continue;
            }
        }

        let value = match attribute {
            Some(attr) => match element.value().attr(attr) {
                Some(v) => v.trim().to_string(),
                None => continue,
            },
            None if first_text => match element.text().map(str::trim).find(|t| !t.is_empty()) {
                Some(t) => collapse_whitespace(t),
                None => continue,
            },
            None => element_text(element),
        };

        match pattern {
            Some(regex) => candidates.extend(regex_matches(regex, &value)),
            None if !value.is_empty() => candidates.push(value),
            None => {}
        }
    }

    candidates
}

fn element_or_parent_mentions(element: ElementRef<'_>, label: &str) -> bool {
    if element_text(element).to_lowercase().contains(label) {
        return true;
    }
    element
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| element_text(parent).to_lowercase().contains(label))
        .unwrap_or(false)
}

/// Finds elements whose own text is the label and reads the adjacent value
///
/// The value is the next sibling element; when the label sits alone inside a
/// wrapper, the wrapper's next sibling is used.
fn labeled_candidates(page: &PageContent, label: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for node in page.document().root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        let own_text: String = element
            .children()
            .filter_map(|c| c.value().as_text().map(|t| String::from(&**t)))
            .collect();
        let own_text = collapse_whitespace(&own_text).trim_end_matches(':').trim().to_lowercase();
        if own_text != label {
            continue;
        }

        let value = next_element_sibling(element).or_else(|| {
            element
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(next_element_sibling)
        });

        if let Some(value) = value {
            let text = element_text(value);
            if !text.is_empty() {
                candidates.push(text);
            }
        }
    }

    candidates
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

fn meta_candidates(page: &PageContent, lookups: &[MetaLookup], pattern: Option<&Regex>) -> Vec<String> {
    let mut candidates = Vec::new();

    for lookup in lookups {
        let values: Vec<String> = match lookup {
            MetaLookup::Title(selector) => page
                .document()
                .select(selector)
                .map(element_text)
                .collect(),
            MetaLookup::Named(selector) => page
                .document()
                .select(selector)
                .filter_map(|e| e.value().attr("content"))
                .map(collapse_whitespace)
                .collect(),
        };

        for value in values.into_iter().filter(|v| !v.is_empty()) {
            match pattern {
                Some(regex) => candidates.extend(regex_matches(regex, &value)),
                None => candidates.push(value),
            }
        }
    }

    candidates
}

/// All matches of `regex` in `haystack`: capture group 1 when the regex has
/// one, the whole match otherwise
fn regex_matches(regex: &Regex, haystack: &str) -> Vec<String> {
    regex
        .captures_iter(haystack)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}
