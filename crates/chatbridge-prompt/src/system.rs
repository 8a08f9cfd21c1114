use serde_json::{Value, json};

/// Makes `system` the one and only system message, at the head of the list.
pub fn upsert_system_message(system: &str, messages: &mut Vec<Value>) {
    messages.retain(|message| message.get("role").and_then(Value::as_str) != Some("system"));
    messages.insert(0, json!({ "role": "system", "content": system }));
}
