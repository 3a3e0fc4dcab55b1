//! Candidate cleaning and shape validation
//!
//! A normalizer either returns the cleaned value or an
//! [`ExtractError::Validation`]; the field extractor treats the latter exactly
//! like "no match" and moves on to the next candidate.

use crate::config::NormalizerConfig;
use crate::extract::compile_regex;
use crate::extract::page::collapse_whitespace;
use crate::url::listing_key;
use crate::{ConfigError, ExtractError};
use regex::Regex;
use url::Url;

/// Compiled normalizer
#[derive(Debug, Clone)]
pub enum Normalizer {
    Text {
        min_len: usize,
        max_len: usize,
        strip: Vec<Regex>,
        reject: Vec<Regex>,
        title_case: bool,
    },
    Currency {
        prefix: String,
        thousands: String,
        token: Regex,
    },
    Digits {
        min: Option<u64>,
        max: Option<u64>,
    },
    /// Resolves a link against the page URL and reduces it to its listing key
    ListingUrl {
        pattern: Regex,
    },
}

impl Normalizer {
    /// Compiles a configured normalizer
    pub fn compile(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            NormalizerConfig::Text {
                min_len,
                max_len,
                strip,
                reject,
                title_case,
            } => {
                if min_len > max_len {
                    return Err(ConfigError::Validation(format!(
                        "text normalizer min-len {} exceeds max-len {}",
                        min_len, max_len
                    )));
                }
                Self::Text {
                    min_len: *min_len,
                    max_len: *max_len,
                    strip: strip.iter().map(|p| compile_regex(p)).collect::<Result<_, _>>()?,
                    reject: reject.iter().map(|p| compile_regex(p)).collect::<Result<_, _>>()?,
                    title_case: *title_case,
                }
            }
            NormalizerConfig::Currency { prefix, thousands } => Self::Currency {
                token: compile_regex(&format!(r"{}\s*(\d[\d.,]*)", regex::escape(prefix)))?,
                prefix: prefix.clone(),
                thousands: thousands.clone(),
            },
            NormalizerConfig::Digits { min, max } => Self::Digits {
                min: *min,
                max: *max,
            },
        })
    }

    /// Link normalizer for search pages
    pub fn listing_url(pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self::ListingUrl {
            pattern: compile_regex(pattern)?,
        })
    }

    /// Cleans `raw` and checks its shape
    ///
    /// `base` is the URL of the page the candidate came from; only the
    /// listing-url normalizer reads it.
    pub fn normalize(&self, raw: &str, base: &Url) -> Result<String, ExtractError> {
        match self {
            Self::Text {
                min_len,
                max_len,
                strip,
                reject,
                title_case,
            } => normalize_text(raw, *min_len, *max_len, strip, reject, *title_case),
            Self::Currency {
                prefix,
                thousands,
                token,
            } => normalize_currency(raw, prefix, thousands, token),
            Self::Digits { min, max } => normalize_digits(raw, *min, *max),
            Self::ListingUrl { pattern } => normalize_listing_url(raw, base, pattern),
        }
    }
}

fn rejected(value: &str, reason: impl Into<String>) -> ExtractError {
    ExtractError::Validation {
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn normalize_text(
    raw: &str,
    min_len: usize,
    max_len: usize,
    strip: &[Regex],
    reject: &[Regex],
    title_case: bool,
) -> Result<String, ExtractError> {
    let mut value = collapse_whitespace(raw);
    for pattern in strip {
        value = pattern.replace_all(&value, "").into_owned();
    }
    let value = value
        .trim()
        .trim_matches(|c: char| matches!(c, '-' | '|' | ',' | ':' | '•'))
        .trim()
        .to_string();

    if let Some(pattern) = reject.iter().find(|p| p.is_match(&value)) {
        return Err(rejected(&value, format!("matches reject pattern {}", pattern)));
    }

    let len = value.chars().count();
    if len < min_len.max(1) || len > max_len {
        return Err(rejected(
            &value,
            format!("length {} outside {}..={}", len, min_len, max_len),
        ));
    }

    Ok(if title_case { to_title_case(&value) } else { value })
}

fn to_title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Produces `"{prefix} {amount}"`
///
/// A prefixed token found in the candidate is kept as written. A bare number
/// is grouped with the thousands separator; a decimal part is dropped.
fn normalize_currency(
    raw: &str,
    prefix: &str,
    thousands: &str,
    token: &Regex,
) -> Result<String, ExtractError> {
    let raw = raw.trim();

    let amount = match token.captures(raw).and_then(|c| c.get(1)) {
        Some(m) => m
            .as_str()
            .trim_end_matches(|c: char| c == '.' || c == ',')
            .to_string(),
        None => format_bare_amount(raw, thousands).ok_or_else(|| rejected(raw, "not a price"))?,
    };

    if !amount.chars().any(|c| c.is_ascii_digit() && c != '0') {
        return Err(rejected(raw, "zero or empty amount"));
    }

    Ok(format!("{} {}", prefix, amount))
}

fn format_bare_amount(raw: &str, thousands: &str) -> Option<String> {
    // Already grouped: "99.900"
    let grouped = !thousands.is_empty()
        && raw.split(thousands).count() > 1
        && raw.split(thousands).enumerate().all(|(i, part)| {
            !part.is_empty()
                && part.chars().all(|c| c.is_ascii_digit())
                && (if i == 0 { part.len() <= 3 } else { part.len() == 3 })
        });
    if grouped {
        return Some(raw.to_string());
    }

    let integer = raw.split(['.', ',']).next()?;
    if integer.is_empty() || !integer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !raw[integer.len()..]
        .chars()
        .skip(1)
        .all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let integer = integer.trim_start_matches('0');
    let digits: Vec<char> = integer.chars().collect();
    let mut out = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(thousands);
        }
        out.push(*c);
    }
    Some(out)
}

fn normalize_digits(raw: &str, min: Option<u64>, max: Option<u64>) -> Result<String, ExtractError> {
    let token: String = raw
        .trim()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();

    let number: u64 = token.parse().map_err(|_| rejected(raw, "no integer"))?;

    if min.map_or(false, |m| number < m) || max.map_or(false, |m| number > m) {
        return Err(rejected(raw, format!("{} out of bounds", number)));
    }

    Ok(number.to_string())
}

fn normalize_listing_url(raw: &str, base: &Url, pattern: &Regex) -> Result<String, ExtractError> {
    let resolved = base
        .join(raw.trim())
        .map_err(|e| rejected(raw, e.to_string()))?;
    let key = listing_key(resolved.as_str()).map_err(|e| rejected(raw, e.to_string()))?;

    if !pattern.is_match(&key) {
        return Err(rejected(&key, "not a listing link"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://sp.olx.com.br/autos?o=2").unwrap()
    }

    fn text(min: usize, max: usize, strip: &[&str], reject: &[&str]) -> Normalizer {
        Normalizer::compile(&NormalizerConfig::Text {
            min_len: min,
            max_len: max,
            strip: strip.iter().map(|s| s.to_string()).collect(),
            reject: reject.iter().map(|s| s.to_string()).collect(),
            title_case: false,
        })
        .unwrap()
    }

    fn currency() -> Normalizer {
        Normalizer::compile(&NormalizerConfig::Currency {
            prefix: "R$".to_string(),
            thousands: ".".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_text_strips_admin_suffixes() {
        let n = text(3, 49, &[r"(?i)último\s*acesso.*$", r"(?i)na\s*olx\s*desde.*$"], &[]);
        assert_eq!(
            n.normalize("  Carlos   Silva Último acesso há 3 dias", &base()).unwrap(),
            "Carlos Silva"
        );
        assert_eq!(
            n.normalize("Ana Na OLX desde 2019", &base()).unwrap(),
            "Ana"
        );
    }

    #[test]
    fn test_text_reject_and_bounds() {
        let n = text(3, 10, &[], &[r"^\d+$"]);
        assert!(matches!(
            n.normalize("2015", &base()),
            Err(ExtractError::Validation { .. })
        ));
        assert!(n.normalize("Al", &base()).is_err());
        assert!(n.normalize("a very long seller name", &base()).is_err());
        assert!(n.normalize("   ", &base()).is_err());
    }

    #[test]
    fn test_text_title_case() {
        let n = Normalizer::compile(&NormalizerConfig::Text {
            min_len: 1,
            max_len: 50,
            strip: vec![],
            reject: vec![],
            title_case: true,
        })
        .unwrap();
        assert_eq!(n.normalize("VOLKSWAGEN do brasil", &base()).unwrap(), "Volkswagen Do Brasil");
    }

    #[test]
    fn test_text_min_over_max_rejected() {
        let config = NormalizerConfig::Text {
            min_len: 10,
            max_len: 5,
            strip: vec![],
            reject: vec![],
            title_case: false,
        };
        assert!(matches!(
            Normalizer::compile(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_currency_keeps_prefixed_token() {
        let n = currency();
        assert_eq!(n.normalize("Preço: R$ 39.900", &base()).unwrap(), "R$ 39.900");
        assert_eq!(n.normalize("R$41.500,", &base()).unwrap(), "R$ 41.500");
    }

    #[test]
    fn test_currency_formats_bare_numbers() {
        let n = currency();
        assert_eq!(n.normalize("99900", &base()).unwrap(), "R$ 99.900");
        assert_eq!(n.normalize("1250000", &base()).unwrap(), "R$ 1.250.000");
        assert_eq!(n.normalize("950", &base()).unwrap(), "R$ 950");
        assert_eq!(n.normalize("99.900", &base()).unwrap(), "R$ 99.900");
        assert_eq!(n.normalize("41200.5", &base()).unwrap(), "R$ 41.200");
    }

    #[test]
    fn test_currency_rejects_non_prices() {
        let n = currency();
        assert!(n.normalize("Consulte", &base()).is_err());
        assert!(n.normalize("0", &base()).is_err());
        assert!(n.normalize("R$ 0", &base()).is_err());
    }

    #[test]
    fn test_digits() {
        let n = Normalizer::compile(&NormalizerConfig::Digits {
            min: Some(1900),
            max: Some(2100),
        })
        .unwrap();
        assert_eq!(n.normalize("Ano 2015", &base()).unwrap(), "2015");
        assert!(n.normalize("1800", &base()).is_err());
        assert!(n.normalize("sem ano", &base()).is_err());

        let km = Normalizer::compile(&NormalizerConfig::Digits { min: None, max: None }).unwrap();
        assert_eq!(km.normalize("45.000 km", &base()).unwrap(), "45000");
    }

    #[test]
    fn test_listing_url() {
        let n = Normalizer::listing_url(r"-\d{8,12}$").unwrap();
        assert_eq!(
            n.normalize("/autos/gol-1234567890?lis=x", &base()).unwrap(),
            "https://sp.olx.com.br/autos/gol-1234567890"
        );
        assert_eq!(
            n.normalize("https://RJ.olx.com.br/a/b-123456789/#top", &base()).unwrap(),
            "https://rj.olx.com.br/a/b-123456789"
        );
        assert!(n.normalize("/autos?o=3", &base()).is_err());
        assert!(n.normalize("javascript:void(0)", &base()).is_err());
    }
}
