//! Converts OpenAI-style message lists into Ollama-style message lists.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{
    ContentPart, MessageContent, OllamaFunctionCall, OllamaMessage, OllamaToolCall,
    OpenAIMessage, OpenAIToolCall,
};

/// Converts each message independently, preserving order.
pub fn convert_messages(messages: &[OpenAIMessage]) -> Result<Vec<OllamaMessage>> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| convert_message(index, message))
        .collect()
}

fn convert_message(index: usize, message: &OpenAIMessage) -> Result<OllamaMessage> {
    let mut converted = OllamaMessage::new(message.role.clone());
    let tool_calls = message.tool_calls.as_deref().unwrap_or_default();

    match &message.content {
        Some(MessageContent::Text(text)) if tool_calls.is_empty() => {
            converted.content = Some(text.clone());
            converted.tool_call_id = message
                .tool_call_id
                .clone()
                .filter(|id| !id.is_empty());
        }
        _ if !tool_calls.is_empty() => {
            let calls = tool_calls
                .iter()
                .map(|call| convert_tool_call(index, call))
                .collect::<Result<Vec<_>>>()?;
            converted.tool_calls = Some(calls);
            // Tool-call messages never carry content in the target schema.
            converted.content = Some(String::new());
        }
        content => {
            let parts: &[ContentPart] = match content {
                Some(MessageContent::Parts(parts)) => parts.as_slice(),
                _ => &[],
            };

            let mut text = String::new();
            let mut images = Vec::new();
            for part in parts {
                match part {
                    ContentPart::Text { text: t } => text.push_str(t),
                    ContentPart::ImageUrl { image_url } => {
                        images.push(strip_data_uri(&image_url.url).to_string());
                    }
                    ContentPart::Unsupported => {}
                }
            }

            if !text.is_empty() {
                converted.content = Some(text.trim().to_string());
            }
            if !images.is_empty() {
                converted.images = Some(images);
            }
        }
    }

    Ok(converted)
}

fn convert_tool_call(message_index: usize, call: &OpenAIToolCall) -> Result<OllamaToolCall> {
    let arguments = match &call.function.arguments {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).map_err(|source| Error::ToolArguments {
                message_index,
                tool_call_id: call.id.clone(),
                source,
            })?
        }
        Some(native) => native.clone(),
    };

    Ok(OllamaToolCall {
        index: call.index.unwrap_or(0),
        id: call.id.clone(),
        function: OllamaFunctionCall {
            name: call.function.name.clone(),
            arguments,
        },
    })
}

/// Returns the base64 payload of a `data:` URI, or the URL unchanged.
pub fn strip_data_uri(url: &str) -> &str {
    if !url.starts_with("data:") {
        return url;
    }
    match url.split_once(',') {
        Some((_, payload)) => payload,
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Role;

    fn messages(value: Value) -> Vec<OpenAIMessage> {
        serde_json::from_value(value).expect("valid openai messages")
    }

    fn convert(value: Value) -> Value {
        let converted = convert_messages(&messages(value)).expect("convert");
        serde_json::to_value(converted).expect("serialize")
    }

    #[test]
    fn plain_text_is_copied_verbatim() {
        let out = convert(json!([
            { "role": "system", "content": "  be brief  " },
            { "role": "user", "content": "hi" },
        ]));
        assert_eq!(
            out,
            json!([
                { "role": "system", "content": "  be brief  " },
                { "role": "user", "content": "hi" },
            ])
        );
    }

    #[test]
    fn tool_result_keeps_tool_call_id() {
        let out = convert(json!([
            { "role": "tool", "content": "42", "tool_call_id": "call_1" },
            { "role": "tool", "content": "43", "tool_call_id": "" },
        ]));
        assert_eq!(out[0]["tool_call_id"], "call_1");
        assert!(out[1].get("tool_call_id").is_none());
    }

    #[test]
    fn tool_calls_parse_arguments_and_clear_content() {
        let out = convert(json!([{
            "role": "assistant",
            "content": "let me check",
            "tool_calls": [
                {
                    "id": "call_a",
                    "type": "function",
                    "function": { "name": "weather", "arguments": "{\"city\":\"Oslo\"}" }
                },
                {
                    "index": 3,
                    "function": { "name": "noop" }
                }
            ]
        }]));

        assert_eq!(
            out,
            json!([{
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {
                        "index": 0,
                        "id": "call_a",
                        "function": { "name": "weather", "arguments": { "city": "Oslo" } }
                    },
                    {
                        "index": 3,
                        "id": null,
                        "function": { "name": "noop", "arguments": {} }
                    }
                ]
            }])
        );
    }

    #[test]
    fn tool_calls_with_null_content_still_get_empty_content() {
        let converted = convert_messages(&messages(json!([{
            "role": "assistant",
            "content": null,
            "tool_calls": [{ "id": "c", "function": { "name": "f", "arguments": "{}" } }]
        }])))
        .expect("convert");
        assert_eq!(converted[0].content.as_deref(), Some(""));
        assert_eq!(converted[0].images, None);
    }

    #[test]
    fn malformed_tool_arguments_name_message_and_call() {
        let err = convert_messages(&messages(json!([
            { "role": "user", "content": "go" },
            {
                "role": "assistant",
                "tool_calls": [{ "id": "call_bad", "function": { "name": "f", "arguments": "{oops" } }]
            }
        ])))
        .expect_err("malformed arguments must fail");

        match &err {
            Error::ToolArguments {
                message_index,
                tool_call_id,
                ..
            } => {
                assert_eq!(*message_index, 1);
                assert_eq!(tool_call_id.as_deref(), Some("call_bad"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("call_bad"));
    }

    #[test]
    fn blocks_concatenate_text_and_collect_images() {
        let out = convert(json!([{
            "role": "user",
            "content": [
                { "type": "text", "text": "  What is " },
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA" } },
                { "type": "text", "text": "this?  " },
                { "type": "image_url", "image_url": { "url": "https://example.com/cat.png" } },
                { "type": "input_audio", "input_audio": { "data": "..." } }
            ]
        }]));

        assert_eq!(
            out,
            json!([{
                "role": "user",
                "content": "What is this?",
                "images": ["AAAA", "https://example.com/cat.png"]
            }])
        );
    }

    #[test]
    fn image_only_message_omits_content() {
        let converted = convert_messages(&messages(json!([{
            "role": "user",
            "content": [
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA" } }
            ]
        }])))
        .expect("convert");
        assert_eq!(converted[0].content, None);
        assert_eq!(converted[0].images, Some(vec!["AAAA".to_string()]));
    }

    #[test]
    fn missing_content_yields_bare_role() {
        let converted = convert_messages(&messages(json!([{ "role": "assistant" }])))
            .expect("convert");
        assert_eq!(converted, vec![OllamaMessage::new(Role::Assistant)]);
    }

    #[test]
    fn unknown_roles_pass_through() {
        let converted = convert_messages(&messages(json!([
            { "role": "developer", "content": "be terse" },
            { "role": "function", "content": "{}" },
            { "role": "user", "content": "hi" },
        ])))
        .expect("convert");

        assert_eq!(converted[0].role, Role::Other("developer".into()));
        assert_eq!(converted[2].role, Role::User);
        assert_eq!(
            serde_json::to_value(&converted).expect("serialize"),
            json!([
                { "role": "developer", "content": "be terse" },
                { "role": "function", "content": "{}" },
                { "role": "user", "content": "hi" },
            ])
        );
    }

    #[test]
    fn untyped_blocks_are_skipped() {
        let out = convert(json!([{
            "role": "user",
            "content": [
                { "text": "no type tag" },
                { "type": "text", "text": "kept" },
                "bare string",
            ]
        }]));
        assert_eq!(out, json!([{ "role": "user", "content": "kept" }]));
    }

    #[test]
    fn data_uri_keeps_text_after_first_comma() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("data:text/csv,a,b"), "a,b");
        assert_eq!(strip_data_uri("data:nocomma"), "data:nocomma");
        assert_eq!(strip_data_uri("https://x/y,z.png"), "https://x/y,z.png");
    }
}
