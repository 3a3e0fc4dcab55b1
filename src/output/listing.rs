//! Listing record rendering
//!
//! Fields are printed in table order. An absent optional field renders as
//! `not available`; an absent required field renders as `NOT FOUND` and is
//! listed again in a warning block at the end.

use crate::config::FieldConfig;
use crate::crawler::ListingRecord;

const NOT_AVAILABLE: &str = "not available";
const NOT_FOUND: &str = "NOT FOUND";

/// Formats a listing record as a field table
pub fn render_listing(record: &ListingRecord, fields: &[FieldConfig]) -> String {
    let width = fields
        .iter()
        .map(|f| f.name.len())
        .chain(std::iter::once("short_link".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("Listing: {}\n", record.url));
    out.push_str(&format!("{}\n", "-".repeat(width + 40)));

    for field in fields {
        let line = match record.fields.get(&field.name) {
            Some(extracted) => format!("{}  [{}]", extracted.value, extracted.source),
            None if field.required => NOT_FOUND.to_string(),
            None => NOT_AVAILABLE.to_string(),
        };
        out.push_str(&format!("{:<width$}  {}\n", field.name, line, width = width));
    }

    let short_link = record.short_link.as_deref().unwrap_or(NOT_AVAILABLE);
    out.push_str(&format!("{:<width$}  {}\n", "short_link", short_link, width = width));

    if !record.missing_required.is_empty() {
        out.push_str("\nWarning: required fields not found:\n");
        for name in &record.missing_required {
            out.push_str(&format!("  - {}\n", name));
        }
    }

    out
}

/// Formats a listing record as pretty JSON
pub fn render_listing_json(record: &ListingRecord) -> serde_json::Result<String> {
    serde_json::to_string_pretty(record)
}
