/// Errors raised while mapping parameters or converting payloads.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter value could not be cast to the type its mapping requires.
    #[error("invalid value for parameter '{key}': {value} (expected {expected})")]
    InvalidParam {
        key: String,
        value: serde_json::Value,
        expected: &'static str,
    },

    /// Tool-call arguments were not valid JSON.
    #[error(
        "message {message_index}: invalid arguments for tool call '{}': {source}",
        .tool_call_id.as_deref().unwrap_or("<no id>")
    )]
    ToolArguments {
        message_index: usize,
        tool_call_id: Option<String>,
        source: serde_json::Error,
    },

    /// A payload field has the wrong JSON shape.
    #[error("payload field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
