//! Personalization directives mined from a user's thumbs-down feedback.

use chatbridge_db::{FeedbackFilter, FeedbackRecord, FeedbackSource};

/// Comment phrase that introduces a banned word.
pub const BANNED_WORD_TRIGGER: &str = "dont use the word";

/// Comment substring that marks a tone instruction.
pub const TONE_TRIGGER: &str = "tone";

/// Characters trimmed from both ends of an extracted banned word.
const BANNED_WORD_TRIM: &[char] = &[' ', '.', '\n', '"', '\''];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// In query order. Repeated feedback repeats the word.
    pub banned_words: Vec<String>,
    /// Raw comments, one per matching record.
    pub tone_instructions: Vec<String>,
}

impl Directives {
    pub fn load(source: &dyn FeedbackSource, user_id: &str) -> Self {
        Self {
            banned_words: banned_words(source, user_id),
            tone_instructions: tone_instructions(source, user_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.banned_words.is_empty() && self.tone_instructions.is_empty()
    }
}

pub fn banned_words(source: &dyn FeedbackSource, user_id: &str) -> Vec<String> {
    negative_feedback(source, user_id, BANNED_WORD_TRIGGER, "banned words")
        .iter()
        .filter_map(|record| extract_banned_word(&record.comment))
        .collect()
}

pub fn tone_instructions(source: &dyn FeedbackSource, user_id: &str) -> Vec<String> {
    negative_feedback(source, user_id, TONE_TRIGGER, "tone instructions")
        .into_iter()
        .map(|record| record.comment)
        .collect()
}

/// Lower-cases `comment` and returns whatever follows the last
/// [`BANNED_WORD_TRIGGER`], trimmed of spaces, periods, newlines and quotes.
pub fn extract_banned_word(comment: &str) -> Option<String> {
    let comment = comment.to_lowercase();
    let (_, rest) = comment.rsplit_once(BANNED_WORD_TRIGGER)?;
    let word = rest.trim_matches(BANNED_WORD_TRIM);
    (!word.is_empty()).then(|| word.to_string())
}

fn negative_feedback(
    source: &dyn FeedbackSource,
    user_id: &str,
    trigger: &str,
    what: &str,
) -> Vec<FeedbackRecord> {
    if user_id.is_empty() {
        return Vec::new();
    }

    let filter = FeedbackFilter::negative_ratings(user_id).comment_contains(trigger);
    match source.select_feedback(&filter) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(user_id, error = %err, "failed to load {what} from feedback store");
            Vec::new()
        }
    }
}
