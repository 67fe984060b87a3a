//! Best-effort recovery of a key/value mapping from free-form config text.
//!
//! Tool configuration arrives as user-authored text that is nominally JSON
//! but frequently is not. Recovery degrades through an ordered chain of
//! strategies, each a deliberately lossier approximation of the previous
//! one, and never fails: the worst case is an empty mapping.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Parse possibly-absent, possibly-malformed config text into a mapping.
/// Empty or missing input short-circuits to an empty mapping.
pub fn parse_config(config: Option<&str>) -> Map<String, Value> {
    match config {
        Some(text) if !text.trim().is_empty() => recover_config(text),
        _ => Map::new(),
    }
}

/// Recover a mapping from arbitrary text. Total: never errors, never panics.
pub fn recover_config(text: &str) -> Map<String, Value> {
    let strategies: [fn(&str) -> Option<Map<String, Value>>; 4] = [
        strict_parse,
        repair_and_parse,
        extract_quoted_pairs,
        extract_loose_pairs,
    ];

    for (i, strategy) in strategies.iter().enumerate() {
        if let Some(map) = strategy(text) {
            debug!(strategy = i + 1, keys = map.len(), "Config recovered");
            return map;
        }
    }

    Map::new()
}

/// Strategy 1: strict JSON parse of the trimmed input.
fn strict_parse(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Strategy 2: repair common syntax errors, then parse strictly.
///
/// Repairs, in order: strip trailing commas before `}`/`]`, quote bare
/// identifier keys following `{` or `,`, and wrap the whole input in braces
/// when it starts with neither `{` nor `[`.
fn repair_and_parse(text: &str) -> Option<Map<String, Value>> {
    let mut fixed = text.trim().to_string();

    let trailing_obj = Regex::new(r",\s*\}").unwrap();
    let trailing_arr = Regex::new(r",\s*\]").unwrap();
    fixed = trailing_obj.replace_all(&fixed, "}").into_owned();
    fixed = trailing_arr.replace_all(&fixed, "]").into_owned();

    let bare_key = Regex::new(r#"([\{,])\s*([A-Za-z0-9_]+)\s*:"#).unwrap();
    fixed = bare_key.replace_all(&fixed, "$1\"$2\":").into_owned();

    if !fixed.starts_with('{') && !fixed.starts_with('[') {
        fixed = format!("{{{}}}", fixed);
    }

    strict_parse(&fixed)
}

/// Strategy 3: scan for quoted-key pairs (string, numeric, and boolean
/// values) and union every match into one mapping.
fn extract_quoted_pairs(text: &str) -> Option<Map<String, Value>> {
    let mut result = Map::new();

    let string_pair = Regex::new(r#""([^"]+)"\s*:\s*"([^"]*)""#).unwrap();
    for caps in string_pair.captures_iter(text) {
        result.insert(caps[1].to_string(), Value::String(caps[2].to_string()));
    }

    let num_pair = Regex::new(r#""([^"]+)"\s*:\s*(-?\d+(?:\.\d+)?)"#).unwrap();
    for caps in num_pair.captures_iter(text) {
        let raw = &caps[2];
        let value = if raw.contains('.') {
            raw.parse::<f64>().ok().and_then(|f| {
                serde_json::Number::from_f64(f).map(Value::Number)
            })
        } else {
            raw.parse::<i64>().ok().map(Value::from)
        };
        if let Some(value) = value {
            result.insert(caps[1].to_string(), value);
        }
    }

    let bool_pair = Regex::new(r#""([^"]+)"\s*:\s*(true|false)"#).unwrap();
    for caps in bool_pair.captures_iter(text) {
        result.insert(caps[1].to_string(), Value::Bool(&caps[2] == "true"));
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Strategy 4, last resort: loose `key=value` / `key:value` tokens with a
/// restricted value charset, coercing booleans and numbers where obvious.
fn extract_loose_pairs(text: &str) -> Option<Map<String, Value>> {
    let pair = Regex::new(r"([A-Za-z0-9_]+)[=:]\s*([A-Za-z0-9_./\\-]+)").unwrap();
    let decimal = Regex::new(r"^-?\d+\.\d+$").unwrap();

    let mut result = Map::new();
    for caps in pair.captures_iter(text) {
        let key = caps[1].to_string();
        let raw = &caps[2];
        let value = if raw.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            raw.parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string()))
        } else if decimal.is_match(raw) {
            raw.parse::<f64>()
                .ok()
                .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
                .unwrap_or_else(|| Value::String(raw.to_string()))
        } else {
            Value::String(raw.to_string())
        };
        result.insert(key, value);
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_yields_empty_mapping() {
        assert!(parse_config(None).is_empty());
        assert!(parse_config(Some("")).is_empty());
        assert!(parse_config(Some("   \n ")).is_empty());
    }

    #[test]
    fn test_well_formed_round_trip() {
        let text = r#"{"command": "/usr/bin/foo", "args": ["-a", "1"], "debug": true}"#;
        let recovered = recover_config(text);
        let strict: Map<String, Value> =
            serde_json::from_str(text).unwrap();
        assert_eq!(Value::Object(recovered), Value::Object(strict));
    }

    #[test]
    fn test_trailing_comma_repair() {
        let broken = r#"{"command": "foo", "args": ["-a",],}"#;
        let recovered = recover_config(broken);
        assert_eq!(recovered["command"], json!("foo"));
        assert_eq!(recovered["args"], json!(["-a"]));
    }

    #[test]
    fn test_bare_key_repair() {
        let broken = r#"{command: "foo", timeout: 5}"#;
        let recovered = recover_config(broken);
        assert_eq!(recovered["command"], json!("foo"));
        assert_eq!(recovered["timeout"], json!(5));
    }

    #[test]
    fn test_brace_wrapping() {
        let bare = r#""command": "foo", "retries": 3"#;
        let recovered = recover_config(bare);
        assert_eq!(recovered["command"], json!("foo"));
        assert_eq!(recovered["retries"], json!(3));
    }

    #[test]
    fn test_quoted_pair_extraction_from_garbage() {
        let garbage = r#"<<< "command": "foo" ;;; "count": 2 ??? "verbose": true >>>"#;
        let recovered = recover_config(garbage);
        assert_eq!(recovered["command"], json!("foo"));
        assert_eq!(recovered["count"], json!(2));
        assert_eq!(recovered["verbose"], json!(true));
    }

    #[test]
    fn test_numeric_coercion_int_vs_float() {
        let garbage = r#"junk "a": 3 junk "b": 3.5"#;
        let recovered = recover_config(garbage);
        assert_eq!(recovered["a"], json!(3));
        assert_eq!(recovered["b"], json!(3.5));
    }

    #[test]
    fn test_loose_pairs_last_resort() {
        let text = "command=/usr/local/bin/server enabled:true port:8080 ratio:0.5";
        let recovered = recover_config(text);
        assert_eq!(recovered["command"], json!("/usr/local/bin/server"));
        assert_eq!(recovered["enabled"], json!(true));
        assert_eq!(recovered["port"], json!(8080));
        assert_eq!(recovered["ratio"], json!(0.5));
    }

    #[test]
    fn test_malformed_launch_descriptor_scenario() {
        // Unquoted YAML-ish text from the authoring UI.
        let text = "command: /usr/bin/foo args: [--x, 1]";
        let recovered = recover_config(text);
        assert_eq!(recovered["command"], json!("/usr/bin/foo"));
    }

    #[test]
    fn test_adversarial_garbage_is_total() {
        for text in ["{{{{", "]]]", "\u{0}\u{1}", "::::====", "🦀🦀🦀"] {
            let _ = recover_config(text); // must not panic
        }
    }
}
