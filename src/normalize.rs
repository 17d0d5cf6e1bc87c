//! Response normalizer
//!
//! Recovers a well-formed JSON value from loosely structured model output:
//! models asked for "RAW JSON ONLY" still wrap answers in markdown fences or
//! prose often enough that every JSON-shaped task goes through this routine.
//!
//! No parse failure escapes as an error; the caller treats `None` as a parse
//! failure, not a crash.

use serde_json::Value;

/// Extract a JSON value from model output
///
/// Attempts, in order, first success wins:
/// 1. direct parse of the full (trimmed) string,
/// 2. the inner content of the first fenced code block (``` or ```json),
/// 3. the substring between the first `{` and the last `}`, inclusive.
///
/// Returns `None` when all three fail.
pub fn normalize(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(inner.trim()) {
            return Some(value);
        }
    }

    if let (Some(first), Some(last)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if first < last {
            if let Ok(value) = serde_json::from_str(&trimmed[first..=last]) {
                return Some(value);
            }
        }
    }

    None
}

/// Inner content of the first triple-backtick block, tolerating a `json` tag
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut body = &text[open + 3..];
    if let Some(rest) = body.strip_prefix("json") {
        body = rest;
    }
    let close = body.find("```")?;
    Some(&body[..close])
}
