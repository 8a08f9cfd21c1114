use chatbridge_db::FeedbackSource;
use serde_json::{Map, Value};

use crate::directives::Directives;
use crate::system::upsert_system_message;
use crate::template;

// ---------------------------------------------------------------------------
// User identity
// ---------------------------------------------------------------------------

/// The caller's view of the requesting user.
#[derive(Debug, Clone, Default)]
pub struct UserIdentity {
    /// Feedback-store key. Empty means "no directives".
    pub id: String,
    pub name: String,
    /// Free-form profile info; `location` is the only key read here.
    pub info: Option<Map<String, Value>>,
}

impl UserIdentity {
    pub fn location(&self) -> Option<&Value> {
        self.info.as_ref()?.get("location")
    }

    fn template_variables(&self) -> Map<String, Value> {
        let mut variables = Map::new();
        variables.insert("user_name".into(), Value::String(self.name.clone()));
        variables.insert(
            "user_location".into(),
            self.location().cloned().unwrap_or(Value::Null),
        );
        variables
    }
}

// ---------------------------------------------------------------------------
// Observability hook
// ---------------------------------------------------------------------------

/// Everything that went into a composed prompt.
#[derive(Debug)]
pub struct PromptComposed<'a> {
    pub system_prompt: &'a str,
    pub user_id: Option<&'a str>,
    pub params: Option<&'a Map<String, Value>>,
    pub banned_words: &'a [String],
    pub tone_instructions: &'a [String],
}

/// Receives one event per composed prompt. Observers cannot fail a request.
pub trait PromptObserver {
    fn prompt_composed(&self, event: &PromptComposed<'_>);
}

/// Emits a `debug`-level tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PromptObserver for TracingObserver {
    fn prompt_composed(&self, event: &PromptComposed<'_>) {
        tracing::debug!(
            user_id = event.user_id.unwrap_or_default(),
            system_prompt = event.system_prompt,
            params = ?event.params,
            banned_words = ?event.banned_words,
            tone_instructions = ?event.tone_instructions,
            "composed system prompt"
        );
    }
}

// ---------------------------------------------------------------------------
// Personalizer
// ---------------------------------------------------------------------------

const BANNED_WORDS_PREAMBLE: &str = "Please do not use the following words in your response:";

/// Builds personalized system prompts. The feedback store is injected so
/// tests can swap in a record list.
pub struct Personalizer<'a> {
    source: &'a dyn FeedbackSource,
    observer: Box<dyn PromptObserver + 'a>,
}

impl<'a> Personalizer<'a> {
    pub fn new(source: &'a dyn FeedbackSource) -> Self {
        Self {
            source,
            observer: Box::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl PromptObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Composes the final system prompt, or `None` when `base` is empty.
    ///
    /// Steps run in a fixed order and each only appends to the text:
    /// 1. substitute `variables`,
    /// 2. append the banned-word sentence,
    /// 3. append the tone instructions,
    /// 4. substitute `user_name` / `user_location`.
    pub fn compose(
        &self,
        base: &str,
        variables: Option<&Map<String, Value>>,
        user: Option<&UserIdentity>,
    ) -> Option<String> {
        if base.is_empty() {
            return None;
        }
        Some(self.compose_with_params(base, variables, user, None))
    }

    /// Rewrites `body.messages` with the composed prompt taken from
    /// `params.system`. Without a system prompt, or when `messages` is not a
    /// list, the body is left alone.
    pub fn apply_to_body(
        &self,
        params: &Map<String, Value>,
        body: &mut Map<String, Value>,
        metadata: Option<&Map<String, Value>>,
        user: Option<&UserIdentity>,
    ) {
        let Some(base) = params
            .get("system")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        else {
            return;
        };

        let mut messages = match body.get_mut("messages") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(messages)) => std::mem::take(messages),
            Some(other) => {
                tracing::warn!(
                    messages = %other,
                    "request messages are not a list; leaving body unchanged"
                );
                return;
            }
        };

        let variables = metadata
            .and_then(|m| m.get("variables"))
            .and_then(Value::as_object);
        let system = self.compose_with_params(base, variables, user, Some(params));

        upsert_system_message(&system, &mut messages);
        body.insert("messages".into(), Value::Array(messages));
    }

    fn compose_with_params(
        &self,
        base: &str,
        variables: Option<&Map<String, Value>>,
        user: Option<&UserIdentity>,
        params: Option<&Map<String, Value>>,
    ) -> String {
        let mut system = match variables {
            Some(variables) => template::render(base, variables),
            None => base.to_string(),
        };

        let user_id = user.map(|u| u.id.as_str()).filter(|id| !id.is_empty());
        let directives = match user_id {
            Some(id) => Directives::load(self.source, id),
            None => Directives::default(),
        };

        if !directives.banned_words.is_empty() {
            system = format!(
                "{system}\n\n{BANNED_WORDS_PREAMBLE} {}.",
                directives.banned_words.join(", ")
            );
        }
        if !directives.tone_instructions.is_empty() {
            system = format!("{system}\n\n{}", directives.tone_instructions.join(" "));
        }

        if let Some(user) = user {
            system = template::render(&system, &user.template_variables());
        }

        self.observer.prompt_composed(&PromptComposed {
            system_prompt: &system,
            user_id,
            params,
            banned_words: &directives.banned_words,
            tone_instructions: &directives.tone_instructions,
        });

        system
    }
}
