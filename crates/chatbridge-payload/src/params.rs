//! Declarative mapping of model/user generation parameters onto a request body.
//!
//! Each protocol has a table of `(key, Cast)` pairs. A key is copied into the
//! body only when the source map carries a non-null value for it, so mapping
//! never introduces defaults and applying it twice is the same as once.

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// How a raw parameter value is coerced before it lands in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    Integer,
    Float,
    Boolean,
    String,
    StringList,
    /// Copied unchanged.
    Passthrough,
    /// A list of strings whose backslash escapes (`\n`, `\t`, `\x41`)
    /// are turned into the literal characters.
    EscapedStringList,
    Object,
}

pub type ParamMapping = (&'static str, Cast);

pub const OPENAI_PARAMS: &[ParamMapping] = &[
    ("temperature", Cast::Float),
    ("top_p", Cast::Float),
    ("max_tokens", Cast::Integer),
    ("frequency_penalty", Cast::Float),
    ("presence_penalty", Cast::Float),
    ("reasoning_effort", Cast::String),
    ("seed", Cast::Passthrough),
    ("stop", Cast::EscapedStringList),
    ("logit_bias", Cast::Passthrough),
    ("response_format", Cast::Object),
];

pub const OLLAMA_PARAMS: &[ParamMapping] = &[
    ("temperature", Cast::Float),
    ("top_p", Cast::Float),
    ("seed", Cast::Passthrough),
    ("mirostat", Cast::Integer),
    ("mirostat_eta", Cast::Float),
    ("mirostat_tau", Cast::Float),
    ("num_ctx", Cast::Integer),
    ("num_batch", Cast::Integer),
    ("num_keep", Cast::Integer),
    ("num_predict", Cast::Integer),
    ("repeat_last_n", Cast::Integer),
    ("top_k", Cast::Integer),
    ("min_p", Cast::Float),
    ("typical_p", Cast::Float),
    ("repeat_penalty", Cast::Float),
    ("presence_penalty", Cast::Float),
    ("frequency_penalty", Cast::Float),
    ("penalize_newline", Cast::Boolean),
    ("stop", Cast::EscapedStringList),
    ("numa", Cast::Boolean),
    ("num_gpu", Cast::Integer),
    ("main_gpu", Cast::Integer),
    ("low_vram", Cast::Boolean),
    ("vocab_only", Cast::Boolean),
    ("use_mmap", Cast::Boolean),
    ("use_mlock", Cast::Boolean),
    ("num_thread", Cast::Integer),
];

/// Ollama names for keys that differ from the OpenAI vocabulary.
const OLLAMA_RENAMES: &[(&str, &str)] = &[("max_tokens", "num_predict")];

/// Options that Ollama expects at the top level of the body.
const OLLAMA_TOP_LEVEL_OPTIONS: &[&str] = &["keep_alive", "format"];

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Copies every mapped, non-null parameter into `body`, cast per its table
/// entry. On a cast failure nothing is written.
pub fn apply_params(
    params: &Map<String, Value>,
    body: &mut Map<String, Value>,
    mappings: &[ParamMapping],
) -> Result<()> {
    if params.is_empty() {
        return Ok(());
    }

    let mut staged = Vec::new();
    for &(key, cast) in mappings {
        let Some(value) = params.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let cast_value = cast.apply(value).ok_or_else(|| Error::InvalidParam {
            key: key.to_string(),
            value: value.clone(),
            expected: cast.expected(),
        })?;
        staged.push((key, cast_value));
    }

    for (key, value) in staged {
        body.insert(key.to_string(), value);
    }
    Ok(())
}

pub fn apply_params_openai(
    params: &Map<String, Value>,
    body: &mut Map<String, Value>,
) -> Result<()> {
    apply_params(params, body, OPENAI_PARAMS)
}

/// Renames OpenAI keys to their Ollama names, maps them, then lifts
/// `keep_alive`/`format` out of `body.options`. The caller's `params` are not
/// modified.
pub fn apply_params_ollama(
    params: &Map<String, Value>,
    body: &mut Map<String, Value>,
) -> Result<()> {
    let mut renamed = params.clone();
    for &(from, to) in OLLAMA_RENAMES {
        if let Some(value) = params.get(from).filter(|v| !v.is_null()) {
            renamed.remove(from);
            renamed.insert(to.to_string(), value.clone());
        }
    }

    apply_params(&renamed, body, OLLAMA_PARAMS)?;
    hoist_options(body, OLLAMA_TOP_LEVEL_OPTIONS);
    Ok(())
}

fn hoist_options(body: &mut Map<String, Value>, keys: &[&str]) {
    let Some(Value::Object(options)) = body.get_mut("options") else {
        return;
    };

    let mut hoisted = Vec::new();
    for &key in keys {
        if let Some(value) = options.remove(key) {
            hoisted.push((key, value));
        }
    }
    for (key, value) in hoisted {
        body.insert(key.to_string(), value);
    }
}

// ---------------------------------------------------------------------------
// Casts
// ---------------------------------------------------------------------------

impl Cast {
    /// Returns `None` when the value cannot be represented as the target type.
    pub fn apply(self, value: &Value) -> Option<Value> {
        match self {
            Cast::Integer => to_integer(value),
            Cast::Float => to_float(value),
            Cast::Boolean => to_boolean(value).map(Value::Bool),
            Cast::String => to_string(value).map(Value::String),
            Cast::StringList => {
                let items = string_items(value)?;
                Some(Value::from(items))
            }
            Cast::EscapedStringList => {
                let items = string_items(value)?
                    .iter()
                    .map(|s| unescape(s))
                    .collect::<Option<Vec<_>>>()?;
                Some(Value::from(items))
            }
            Cast::Passthrough => Some(value.clone()),
            Cast::Object => value.is_object().then(|| value.clone()),
        }
    }

    pub fn expected(self) -> &'static str {
        match self {
            Cast::Integer => "an integer",
            Cast::Float => "a number",
            Cast::Boolean => "a boolean",
            Cast::String => "a string",
            Cast::StringList | Cast::EscapedStringList => "a list of strings",
            Cast::Passthrough => "any value",
            Cast::Object => "an object",
        }
    }
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(Value::Number(n.clone()))
            } else {
                let f = n.as_f64()?;
                // Truncates toward zero, like an integer conversion of a float.
                (f.is_finite() && f.abs() < i64::MAX as f64).then(|| Value::from(f.trunc() as i64))
            }
        }
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A single string counts as a one-element list.
fn string_items(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

/// Resolves backslash escapes. Unknown escapes are kept as written; a
/// dangling backslash or a malformed `\x`/`\u`/`\U` escape is an error.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '\n' => {}
            'x' => out.push(hex_char(&mut chars, 2)?),
            'u' => out.push(hex_char(&mut chars, 4)?),
            'U' => out.push(hex_char(&mut chars, 8)?),
            d @ '0'..='7' => {
                let mut code = d.to_digit(8)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code)?);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    Some(out)
}

fn hex_char(chars: &mut impl Iterator<Item = char>, len: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..len {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}
