//! Bounded-depth breadth-first search over JSON trees
//!
//! Every consumer of embedded payloads (structured-data strategies, the total
//! estimator) goes through these functions, so the traversal order and depth
//! accounting are the same everywhere. The root is depth 0; each object member
//! or array element is one level deeper.

use serde_json::Value;
use std::collections::VecDeque;

/// Depth used to locate scope containers (`within`) from a payload root
pub const CONTAINER_DEPTH: usize = 6;

/// Extra depth allowed below a scope for `{name, value}` property lists
const PROPERTY_LIST_DEPTH: usize = 3;

/// Collects the values stored under any of `keys`, in breadth-first order
///
/// Within one object, keys are checked in the order given. A matching value is
/// not searched further.
pub fn find_all<'a>(root: &'a Value, keys: &[String], max_depth: usize) -> Vec<&'a Value> {
    let mut found = Vec::new();
    walk(root, max_depth, |object_key, value| {
        if keys.iter().any(|k| k == object_key) {
            found.push(value);
            false
        } else {
            true
        }
    });
    found
}

/// Returns the first value under any of `keys` for which `f` returns `Some`
pub fn find_map<'a, T>(
    root: &'a Value,
    keys: &[String],
    max_depth: usize,
    mut f: impl FnMut(&'a Value) -> Option<T>,
) -> Option<T> {
    let mut queue: VecDeque<(&'a Value, usize)> = VecDeque::new();
    queue.push_back((root, 0));

    while let Some((value, depth)) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                for key in keys {
                    if let Some(hit) = map.get(key).and_then(&mut f) {
                        return Some(hit);
                    }
                }
                if depth < max_depth {
                    queue.extend(map.values().map(|child| (child, depth + 1)));
                }
            }
            Value::Array(items) if depth < max_depth => {
                queue.extend(items.iter().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }

    None
}

/// Finds object or array containers stored under any of `keys`
pub fn find_containers<'a>(root: &'a Value, keys: &[String]) -> Vec<&'a Value> {
    find_all(root, keys, CONTAINER_DEPTH)
        .into_iter()
        .filter(|v| v.is_object() || v.is_array())
        .collect()
}

/// Reads `value` entries of property lists whose `name` or `label` matches
///
/// Marketplace payloads describe attributes as
/// `[{"name": "mileage", "label": "Quilometragem", "value": "12000"}]`.
/// Names compare case-insensitively.
pub fn property_values<'a>(root: &'a Value, names: &[String], max_depth: usize) -> Vec<&'a Value> {
    let mut found = Vec::new();
    let mut queue: VecDeque<(&'a Value, usize)> = VecDeque::new();
    queue.push_back((root, 0));
    let limit = max_depth + PROPERTY_LIST_DEPTH;

    while let Some((value, depth)) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                let named = ["name", "label"].iter().any(|tag| {
                    map.get(*tag)
                        .and_then(Value::as_str)
                        .map(|s| names.iter().any(|n| n.eq_ignore_ascii_case(s.trim())))
                        .unwrap_or(false)
                });
                if named {
                    if let Some(v) = map.get("value") {
                        found.push(v);
                        continue;
                    }
                }
                if depth < limit {
                    queue.extend(map.values().map(|child| (child, depth + 1)));
                }
            }
            Value::Array(items) if depth < limit => {
                queue.extend(items.iter().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }

    found
}

/// Renders a scalar JSON value as a candidate string
///
/// Strings are trimmed; numbers print as written. Everything else is not a
/// candidate.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a positive count from a number or numeric string
pub fn positive_count(value: &Value) -> Option<u64> {
    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }?;
    (count > 0).then_some(count)
}

/// Parses "1.240", "1,240" or "1240" as 1240
pub fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn walk<'a>(root: &'a Value, max_depth: usize, mut visit: impl FnMut(&str, &'a Value) -> bool) {
    let mut queue: VecDeque<(&'a Value, usize)> = VecDeque::new();
    queue.push_back((root, 0));

    while let Some((value, depth)) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if visit(key, child) && depth < max_depth {
                        queue.push_back((child, depth + 1));
                    }
                }
            }
            Value::Array(items) if depth < max_depth => {
                queue.extend(items.iter().map(|child| (child, depth + 1)));
            }
            _ => {}
        }
    }
}
