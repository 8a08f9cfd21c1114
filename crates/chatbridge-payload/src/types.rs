//! Chat-completion wire types.
//!
//! The OpenAI-style shapes are only ever read (they arrive from clients), the
//! Ollama-style shapes are only ever written. Both keep every field optional
//! that clients are known to omit.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Unrecognised roles (`developer`, `function`, ...) are carried through as-is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    #[serde(untagged)]
    Other(String),
}

// ---------------------------------------------------------------------------
// OpenAI-style (source)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

/// Either a plain string or a list of typed content blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(#[serde(deserialize_with = "content_parts")] Vec<ContentPart>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: String,
    },
    ImageUrl {
        #[serde(default)]
        image_url: ImageUrl,
    },
    /// Audio, files and anything else Ollama has no slot for.
    #[serde(other)]
    Unsupported,
}

/// Blocks without a `type` tag (or that are not objects) become `Unsupported`.
fn content_parts<'de, D>(deserializer: D) -> Result<Vec<ContentPart>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPart {
        Tagged(ContentPart),
        Untagged(IgnoredAny),
    }

    let parts = Vec::<RawPart>::deserialize(deserializer)?;
    Ok(parts
        .into_iter()
        .map(|part| match part {
            RawPart::Tagged(part) => part,
            RawPart::Untagged(_) => ContentPart::Unsupported,
        })
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUrl {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIToolCall {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// A JSON-encoded string on the wire. Some clients already send an object.
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Ollama-style (target)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Base64 payloads or plain URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl OllamaMessage {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            content: None,
            images: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaToolCall {
    pub index: u32,
    pub id: Option<String>,
    pub function: OllamaFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    /// Native JSON, never a string.
    pub arguments: serde_json::Value,
}
