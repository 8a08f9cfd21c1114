//! `{{ name }}` placeholder substitution for system prompts.
//!
//! Unknown placeholders are left in place so a later pass with a different
//! variable set can still resolve them.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("placeholder pattern")
});

/// Rendered in place of a `null` variable.
const UNKNOWN: &str = "Unknown";

pub fn render(template: &str, variables: &Map<String, Value>) -> String {
    if variables.is_empty() {
        return template.to_string();
    }

    let mut exact: HashMap<&str, &Value> = HashMap::new();
    let mut folded: HashMap<String, &Value> = HashMap::new();
    for (key, value) in variables {
        let name = variable_name(key);
        exact.insert(name, value);
        folded.entry(name.to_ascii_lowercase()).or_insert(value);
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            exact
                .get(name)
                .or_else(|| folded.get(&name.to_ascii_lowercase()))
                .map(|value| render_value(value))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Accepts both `name` and the wrapped `{{name}}` form as a key.
fn variable_name(key: &str) -> &str {
    let key = key.trim();
    key.strip_prefix("{{")
        .and_then(|k| k.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(key)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => UNKNOWN.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
