//! Tolerant parsing of LLM-produced JSON.
//!
//! Models routinely wrap JSON in markdown fences despite instructions
//! not to. Fences are stripped before parsing, and a parse failure
//! degrades to a wrapper object instead of an error so callers stay
//! total.

use serde_json::{json, Value};
use tracing::debug;

/// Strip a surrounding markdown code fence (```json ... ``` or
/// ``` ... ```) if present. Inner content is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse LLM output as JSON, tolerating markdown fences. On failure,
/// returns `{"response": <raw text>, "parse_error": true}` rather than
/// raising.
pub fn parse_llm_json(text: &str) -> Value {
    let candidate = strip_code_fences(text);
    match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "LLM output is not valid JSON, wrapping raw text");
            json!({
                "response": text,
                "parse_error": true,
            })
        }
    }
}

/// Whether a parsed value is the degraded parse-failure wrapper.
pub fn is_parse_error(value: &Value) -> bool {
    value
        .get("parse_error")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
