//! Key normalization: rewrite `snake_case` object keys to `camelCase`.
//!
//! Applied recursively through objects and arrays; scalars are returned
//! unchanged. Keys that look numeric are left alone, so id-keyed maps such as
//! `{"123": {...}}` survive. Already-camelCase input is a fixed point.

use serde_json::{Map, Value};

/// Camelize a single key.
///
/// Every run of `_`, `-` or whitespace is removed and the character after it
/// is upper-cased; the first character is always lower-cased.
///
/// ```
/// use call_api_core::camelize::camelize;
///
/// assert_eq!(camelize("release_year"), "releaseYear");
/// assert_eq!(camelize("total-track count"), "totalTrackCount");
/// assert_eq!(camelize("AlbumName"), "albumName");
/// assert_eq!(camelize("42"), "42");
/// ```
#[must_use]
pub fn camelize(key: &str) -> String {
    if is_numeric(key) {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if is_separator(ch) {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    let mut chars = out.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => out,
    }
}

/// Recursively camelize every object key in `value`.
///
/// ```
/// use call_api_core::camelize::camelize_keys;
/// use serde_json::json;
///
/// let raw = json!({"album_name": "X", "release_year": 1999});
/// assert_eq!(camelize_keys(raw), json!({"albumName": "X", "releaseYear": 1999}));
/// ```
#[must_use]
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camelize(&key), camelize_keys(value)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        scalar => scalar,
    }
}

fn is_separator(ch: char) -> bool {
    ch == '_' || ch == '-' || ch.is_whitespace()
}

fn is_numeric(key: &str) -> bool {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return true;
    }
    trimmed.chars().any(|c| c.is_ascii_digit()) && trimmed.parse::<f64>().is_ok()
}
