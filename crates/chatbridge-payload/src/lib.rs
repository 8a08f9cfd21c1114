//! Payload adaptation between the OpenAI-style and Ollama-style chat schemas.

pub mod convert;
pub mod error;
pub mod params;
pub mod payload;
pub mod types;

pub use convert::{convert_messages, strip_data_uri};
pub use error::{Error, Result};
pub use params::{
    Cast, OLLAMA_PARAMS, OPENAI_PARAMS, ParamMapping, apply_params, apply_params_ollama,
    apply_params_openai,
};
pub use payload::convert_payload;
pub use types::{
    ContentPart, FunctionCall, ImageUrl, MessageContent, OllamaFunctionCall, OllamaMessage,
    OllamaToolCall, OpenAIMessage, OpenAIToolCall, Role,
};
