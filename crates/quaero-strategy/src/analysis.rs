//! Normalization of LLM-produced analysis JSON.
//!
//! The analysis phase returns a loosely-shaped object with many
//! optional fields. This module is the single default-filling pass that
//! makes downstream code total: every required field is present after
//! normalization, with conservative defaults, and nothing here can fail.

use serde_json::{json, Map, Value};

/// Default source priority when the LLM omits one.
pub const DEFAULT_SOURCE_PRIORITY: &[&str] = &["org", "cloud", "personal"];

/// Fill required analysis fields with conservative defaults.
///
/// Accepts any JSON shape; non-object input (including the
/// `parse_error` wrapper from a failed parse) is replaced by an
/// all-defaults object.
pub fn normalize_analysis(raw: Value) -> Value {
    let mut obj = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    ensure_string(&mut obj, "intent_summary", "general_information");
    ensure_string(&mut obj, "primary_query", "");
    ensure_string_array(&mut obj, "alternative_queries");
    ensure_string_array(&mut obj, "key_terms");
    ensure_string(&mut obj, "complexity", "simple");
    ensure_bool(&mut obj, "needs_web", false);

    let priority_ok = obj
        .get("source_priority")
        .map(|v| v.is_array())
        .unwrap_or(false);
    if !priority_ok {
        obj.insert(
            "source_priority".to_string(),
            json!(DEFAULT_SOURCE_PRIORITY),
        );
    }

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);
    obj.insert("confidence".to_string(), json!(confidence));

    Value::Object(obj)
}

fn ensure_string(obj: &mut Map<String, Value>, key: &str, default: &str) {
    let ok = obj.get(key).map(|v| v.is_string()).unwrap_or(false);
    if !ok {
        obj.insert(key.to_string(), json!(default));
    }
}

fn ensure_bool(obj: &mut Map<String, Value>, key: &str, default: bool) {
    let ok = obj.get(key).map(|v| v.is_boolean()).unwrap_or(false);
    if !ok {
        obj.insert(key.to_string(), json!(default));
    }
}

fn ensure_string_array(obj: &mut Map<String, Value>, key: &str) {
    let normalized = match obj.get(key) {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect::<Vec<_>>(),
        ),
        // A bare string becomes a single-element list.
        Some(Value::String(s)) => Some(vec![s.clone()]),
        _ => None,
    };
    obj.insert(
        key.to_string(),
        json!(normalized.unwrap_or_default()),
    );
}
