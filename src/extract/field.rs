//! Per-field strategy cascade
//!
//! For each field, strategies run in rank order and each candidate is
//! normalized in document order. The first candidate that normalizes cleanly
//! is the field's value and the strategy's name is its provenance. There is no
//! voting and no merging across strategies.

use crate::config::FieldConfig;
use crate::extract::normalize::Normalizer;
use crate::extract::page::PageContent;
use crate::extract::strategy::StrategyChain;
use crate::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;

/// A value together with the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted {
    pub value: String,
    pub source: String,
}

/// Field name to extracted value
///
/// A field no strategy satisfied is absent from the map. Absent and empty are
/// different things: an extracted value is never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractionResult {
    fields: BTreeMap<String, Extracted>,
}

impl ExtractionResult {
    pub fn get(&self, field: &str) -> Option<&Extracted> {
        self.fields.get(field)
    }

    /// The value of `field`, if extracted
    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|e| e.value.as_str())
    }

    pub fn insert(&mut self, field: impl Into<String>, extracted: Extracted) {
        self.fields.insert(field.into(), extracted);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Extracted)> {
        self.fields.iter()
    }

    /// Names of required fields that are absent, in table order
    pub fn missing_required(&self, specs: &[FieldSpec]) -> Vec<String> {
        specs
            .iter()
            .filter(|spec| spec.required && !self.fields.contains_key(&spec.name))
            .map(|spec| spec.name.clone())
            .collect()
    }
}

/// One compiled field definition
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub required: bool,
    pub chain: StrategyChain,
    pub normalizer: Normalizer,
}

impl FieldSpec {
    pub fn compile(config: &FieldConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: config.name.clone(),
            required: config.required,
            chain: StrategyChain::compile(&config.strategies)?,
            normalizer: Normalizer::compile(&config.normalizer)?,
        })
    }

    /// Runs the cascade for this field
    pub fn extract(&self, page: &PageContent) -> Option<Extracted> {
        for strategy in self.chain.iter() {
            for candidate in strategy.candidates(page) {
                match self.normalizer.normalize(&candidate, page.url()) {
                    Ok(value) => {
                        tracing::trace!(field = %self.name, source = %strategy.name, %value, "Field extracted");
                        return Some(Extracted {
                            value,
                            source: strategy.name.clone(),
                        });
                    }
                    Err(e) => {
                        tracing::trace!(field = %self.name, source = %strategy.name, "{}", e);
                    }
                }
            }
        }

        tracing::debug!(field = %self.name, "No strategy produced a valid value");
        None
    }
}

/// Extracts every configured field from a page
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    specs: Vec<FieldSpec>,
}

impl FieldExtractor {
    /// Compiles the configured fields
    pub fn from_config(fields: &[FieldConfig]) -> Result<Self, ConfigError> {
        let specs = fields
            .iter()
            .map(FieldSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Runs the cascade for one field
    pub fn extract_field(&self, spec: &FieldSpec, page: &PageContent) -> Option<Extracted> {
        spec.extract(page)
    }

    /// Runs every field's cascade
    pub fn extract(&self, page: &PageContent) -> ExtractionResult {
        let mut result = ExtractionResult::default();
        for spec in &self.specs {
            if let Some(extracted) = self.extract_field(spec, page) {
                result.insert(spec.name.clone(), extracted);
            }
        }
        result
    }
}
