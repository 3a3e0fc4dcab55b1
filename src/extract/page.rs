//! Fetched page representation
//!
//! A page is parsed exactly once into a [`PageContent`]. Every strategy reads
//! from it; none of them re-parse the markup.
//!
//! `scraper::Html` is not `Send`, so a `PageContent` must be built and
//! consumed inside one synchronous call and never held across an `.await`.

use crate::config::PayloadSource;
use crate::extract::compile_selector;
use crate::{ConfigError, ExtractError};
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// A JSON payload embedded in the page
#[derive(Debug, Clone)]
pub struct Payload {
    /// Name of the configured source it came from
    pub source: String,
    pub value: Value,
}

/// Compiled payload locations
#[derive(Debug, Clone, Default)]
pub struct PayloadSources {
    entries: Vec<(String, Selector, Option<String>)>,
}

impl PayloadSources {
    /// Compiles the configured payload sources
    pub fn compile(sources: &[PayloadSource]) -> Result<Self, ConfigError> {
        let entries = sources
            .iter()
            .map(|s| {
                Ok((
                    s.name.clone(),
                    compile_selector(&s.selector)?,
                    s.attribute.clone(),
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { entries })
    }

    /// Reads and decodes every payload found in `document`
    ///
    /// Malformed payloads are skipped; the error is logged at debug level and
    /// the remaining sources are still read.
    fn read(&self, document: &Html) -> Vec<Payload> {
        let mut payloads = Vec::new();

        for (name, selector, attribute) in &self.entries {
            for element in document.select(selector) {
                let raw = match attribute {
                    Some(attr) => match element.value().attr(attr) {
                        Some(value) => value.to_string(),
                        None => continue,
                    },
                    None => element.text().collect::<String>(),
                };

                match decode_payload(name, &raw) {
                    Ok(value) => payloads.push(Payload {
                        source: name.clone(),
                        value,
                    }),
                    Err(e) => tracing::debug!("Skipping payload: {}", e),
                }
            }
        }

        payloads
    }
}

fn decode_payload(name: &str, raw: &str) -> Result<Value, ExtractError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ExtractError::Parse {
            source_name: name.to_string(),
            message: "empty payload".to_string(),
        });
    }
    serde_json::from_str(raw).map_err(|e| ExtractError::Parse {
        source_name: name.to_string(),
        message: e.to_string(),
    })
}

/// One fetched page, parsed once
pub struct PageContent {
    url: Url,
    raw: String,
    document: Html,
    text: String,
    payloads: Vec<Payload>,
}

impl PageContent {
    /// Parses a page body fetched from `url`
    pub fn parse(url: Url, raw: String, sources: &PayloadSources) -> Self {
        let document = Html::parse_document(&raw);
        let text = visible_text(&document);
        let payloads = sources.read(&document);

        Self {
            url,
            raw,
            document,
            text,
            payloads,
        }
    }

    /// The URL the page was fetched from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The page source as fetched
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Visible text: every text node outside script and style, joined by a
    /// single space
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Decoded embedded payloads, in source order
    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }
}

fn visible_text(document: &Html) -> String {
    let mut parts: Vec<String> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
            .unwrap_or(false);
        if hidden {
            continue;
        }

        let cleaned = collapse_whitespace(text);
        if !cleaned.is_empty() {
            parts.push(cleaned);
        }
    }

    parts.join(" ")
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
