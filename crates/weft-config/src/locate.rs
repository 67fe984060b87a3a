//! Locate a capability-provider launch descriptor inside a parsed mapping.
//!
//! Authoring UIs paste provider config in several wrapper formats (for
//! example the named-server shape `{"mcpServers": {"name": {...}}}`), so the
//! launch command may sit at any nesting depth. The search is depth-first
//! with the current level checked before descending; the first mapping
//! containing a `command` key wins.

use std::collections::HashMap;

use serde_json::Value;

/// Launch parameters for an external-process capability provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Capability names the author switched off on this provider.
    pub disabled: Vec<String>,
}

/// Find the first launch descriptor in `value`, however deeply nested.
/// Non-mapping input is a guaranteed no-op, not an error.
pub fn locate_launch(value: &Value) -> Option<LaunchSpec> {
    let map = value.as_object()?;

    // Current level before children. An empty command counts as absent and
    // the search keeps descending.
    if let Some(command) = map.get("command").and_then(Value::as_str) {
        if !command.is_empty() {
            return Some(LaunchSpec {
                command: command.to_string(),
                args: string_list(map.get("args")),
                env: string_map(map.get("env")),
                disabled: string_list(map.get("disabled_tools")),
            });
        }
    }

    for child in map.values() {
        if child.is_object() {
            if let Some(spec) = locate_launch(child) {
                return Some(spec);
            }
        }
    }

    None
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn string_map(value: Option<&Value>) -> HashMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let s = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), s)
                })
                .collect()
        })
        .unwrap_or_default()
}
