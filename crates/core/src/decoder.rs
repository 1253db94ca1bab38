//! Extraction of JSON payloads from free-form model text.
//!
//! Models wrap JSON in markdown fences, surround it with prose, or return
//! it bare. [`decode`] recovers the most plausible JSON text without
//! validating it; [`decode_json`] additionally parses it.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

use crate::{Error, Result};

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```[A-Za-z0-9_+\-]*[ \t]*\r?\n?([\s\S]*?)```").expect("fence pattern is valid")
    })
}

/// Best-effort JSON text from a model response.
pub fn decode(raw: &str) -> String {
    let body = fence_pattern()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let body = body.trim();
    if body.starts_with('[') || body.starts_with('{') {
        return body.to_string();
    }

    match first_balanced_array(body) {
        Some(array) => array.to_string(),
        None => body.to_string(),
    }
}

/// Decode and parse a model response into `T`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let text = decode(raw);
    serde_json::from_str(&text).map_err(|e| {
        Error::decode(format!(
            "{} (payload starts with {:?})",
            e,
            text.chars().take(80).collect::<String>()
        ))
    })
}

/// First `[...]` substring whose brackets balance, ignoring brackets
/// inside string literals.
fn first_balanced_array(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find('[') {
        let start = search_from + rel;
        if let Some(end) = matching_close(text, start) {
            return Some(&text[start..=end]);
        }
        search_from = start + 1;
    }
    None
}

fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
