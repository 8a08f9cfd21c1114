//! Assembles a complete Ollama-style request body from an OpenAI-style one.

use serde_json::{Map, Value};

use crate::convert::convert_messages;
use crate::error::{Error, Result};
use crate::types::OpenAIMessage;

/// Fields copied to the target unchanged when the source has them.
const VERBATIM_FIELDS: &[&str] = &["tools", "format"];

/// Options Ollama reads from the top level rather than from `options`.
const HOISTED_OPTIONS: &[&str] = &["system", "keep_alive"];

pub fn convert_payload(source: &Map<String, Value>) -> Result<Map<String, Value>> {
    let messages: Vec<OpenAIMessage> = match source.get("messages") {
        None | Some(Value::Null) => Vec::new(),
        Some(messages) => serde_json::from_value(messages.clone())?,
    };

    let mut target = Map::new();
    target.insert(
        "model".into(),
        source.get("model").cloned().unwrap_or(Value::Null),
    );
    target.insert(
        "messages".into(),
        serde_json::to_value(convert_messages(&messages)?)?,
    );
    target.insert(
        "stream".into(),
        source.get("stream").cloned().unwrap_or(Value::Bool(false)),
    );

    for &field in VERBATIM_FIELDS {
        if let Some(value) = source.get(field) {
            target.insert(field.into(), value.clone());
        }
    }

    match source.get("options") {
        Some(Value::Object(options)) if !options.is_empty() => {
            let mut options = options.clone();
            if let Some(max_tokens) = options.remove("max_tokens") {
                options.insert("num_predict".into(), max_tokens);
            }
            for &key in HOISTED_OPTIONS {
                if let Some(value) = options.remove(key) {
                    target.insert(key.into(), value);
                }
            }
            target.insert("options".into(), Value::Object(options));
        }
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(Error::InvalidField {
                field: "options",
                expected: "an object",
            });
        }
    }

    // Runs after the options copy, so a top-level `stop` wins.
    if let Some(stop) = source.get("stop") {
        let options = target
            .entry("options")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(options) = options.as_object_mut() {
            options.insert("stop".into(), stop.clone());
        }
    }

    if let Some(metadata) = source.get("metadata") {
        target.insert("metadata".into(), metadata.clone());
    }

    if let Some(response_format) = source.get("response_format") {
        match native_format(response_format) {
            Some(schema) => {
                target.insert("format".into(), schema.clone());
            }
            None => tracing::debug!(
                %response_format,
                "response_format carries no nested schema; leaving format unchanged"
            ),
        }
    }

    Ok(target)
}

/// `{"type": T, T: {"schema": S}}` yields `S`.
fn native_format(response_format: &Value) -> Option<&Value> {
    let format_type = response_format.get("type")?.as_str()?;
    response_format.get(format_type)?.get("schema")
}
