//! Offline batch job that collects every user's banned words into one JSON
//! artifact. Uses a looser pattern than the live path.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use chatbridge_db::{FeedbackRecord, Store};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

static BANNED_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:dont|don't|avoid)\s+(?:use\s+(?:the\s+)?(?:word\s+)?)?['"]?(\w+)['"]?"#)
        .expect("banned word pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBannedWords {
    /// Distinct words in first-seen order.
    pub banned_words: Vec<String>,
    /// When the most recent new word was added.
    pub last_updated: DateTime<Utc>,
}

/// User id to banned words, serialized in key order.
pub type BannedWordIndex = BTreeMap<String, UserBannedWords>;

/// First word following "dont", "don't" or "avoid" in the lower-cased comment.
pub fn match_banned_word(comment: &str) -> Option<String> {
    let comment = comment.to_lowercase();
    let word = BANNED_WORD.captures(&comment)?.get(1)?.as_str();
    Some(word.to_string())
}

pub fn build_index<'a>(
    records: impl IntoIterator<Item = &'a FeedbackRecord>,
    now: DateTime<Utc>,
) -> BannedWordIndex {
    let mut index = BannedWordIndex::new();
    for record in records {
        let Some(word) = match_banned_word(&record.comment) else {
            continue;
        };
        let entry = index
            .entry(record.user_id.clone())
            .or_insert_with(|| UserBannedWords {
                banned_words: Vec::new(),
                last_updated: now,
            });
        if !entry.banned_words.contains(&word) {
            entry.banned_words.push(word);
            entry.last_updated = now;
        }
    }
    index
}

/// Scans every commented feedback row in `store`.
pub fn scan(store: &Store, now: DateTime<Utc>) -> Result<BannedWordIndex> {
    let records = store.feedback().with_comments()?;
    let index = build_index(&records, now);
    tracing::info!(
        records = records.len(),
        users = index.len(),
        "built banned word index"
    );
    Ok(index)
}

/// Writes the index as pretty-printed JSON, creating parent directories.
pub fn write_index(index: &BannedWordIndex, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(index)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use chatbridge_db::FeedbackKind;
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn record(id: &str, user_id: &str, rating: Option<i64>, comment: &str) -> FeedbackRecord {
        FeedbackRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            kind: FeedbackKind::Rating,
            rating,
            comment: comment.to_string(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("chatbridge-index-{}-{nanos}", std::process::id()))
            .join(name)
    }

    #[test]
    fn matches_loose_phrasings() {
        assert_eq!(match_banned_word("Dont use the word 'Delve'"), Some("delve".into()));
        assert_eq!(match_banned_word("please don't say hello"), Some("say".into()));
        assert_eq!(match_banned_word("AVOID \"synergy\" here"), Some("synergy".into()));
        assert_eq!(match_banned_word("don't use word leverage"), Some("leverage".into()));
        assert_eq!(match_banned_word("great answer"), None);
    }

    #[test]
    fn index_dedups_per_user_and_ignores_rating() {
        let records = vec![
            record("1", "u1", Some(-1), "dont use the word delve"),
            record("2", "u1", Some(1), "avoid 'delve'"),
            record("3", "u1", None, "avoid tapestry"),
            record("4", "u2", Some(-1), "no opinion"),
            record("5", "u3", Some(-1), "don't use leverage"),
        ];

        let index = build_index(&records, at(1_700_000_000));
        assert_eq!(index.len(), 2);
        assert_eq!(index["u1"].banned_words, vec!["delve", "tapestry"]);
        assert_eq!(index["u3"].banned_words, vec!["leverage"]);
        assert!(!index.contains_key("u2"));
    }

    #[test]
    fn entries_exist_only_for_users_with_a_match() {
        let records = vec![
            record("1", "u1", Some(-1), "too long"),
            record("2", "u1", Some(-1), "avoid delve"),
            record("3", "u1", Some(-1), "avoid delve please"),
        ];
        let index = build_index(&records, at(100));
        assert_eq!(
            index["u1"],
            UserBannedWords {
                banned_words: vec!["delve".into()],
                last_updated: at(100),
            }
        );
        assert!(build_index(&records[..1], at(100)).is_empty());
    }

    #[test]
    fn serializes_rfc3339_timestamps_in_user_order() {
        let records = vec![
            record("1", "zed", Some(-1), "avoid delve"),
            record("2", "amy", Some(-1), "avoid tapestry"),
        ];
        let index = build_index(&records, at(0));

        let value = serde_json::to_value(&index).expect("serialize");
        assert_eq!(
            value,
            json!({
                "amy": { "banned_words": ["tapestry"], "last_updated": "1970-01-01T00:00:00Z" },
                "zed": { "banned_words": ["delve"], "last_updated": "1970-01-01T00:00:00Z" },
            })
        );
        let text = serde_json::to_string_pretty(&index).expect("serialize");
        assert!(text.find("\"amy\"") < text.find("\"zed\""));
    }

    #[test]
    fn scan_reads_commented_rows_from_store() {
        let store = Store::open_in_memory().expect("store");
        let feedback = store.feedback();
        feedback
            .insert(&record("1", "u1", Some(-1), "dont use the word 'delve'"))
            .expect("insert");
        feedback
            .insert(&record("2", "u1", Some(1), ""))
            .expect("insert");
        feedback
            .insert(&record("3", "u2", Some(1), "avoid jargon"))
            .expect("insert");

        let index = scan(&store, at(42)).expect("scan");
        assert_eq!(index["u1"].banned_words, vec!["delve"]);
        assert_eq!(index["u2"].banned_words, vec!["jargon"]);
        assert_eq!(index["u2"].last_updated, at(42));
    }

    #[test]
    fn write_index_creates_parents_and_round_trips() {
        let path = temp_path("nested/banned_words.json");
        let records = vec![record("1", "u1", Some(-1), "avoid delve")];
        let index = build_index(&records, at(5));

        write_index(&index, &path).expect("write");
        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.contains("\n  \"u1\": {"));
        let parsed: BannedWordIndex = serde_json::from_str(&text).expect("parse");
        assert_eq!(parsed, index);

        if let Some(root) = path.parent().and_then(Path::parent) {
            let _ = fs::remove_dir_all(root);
        }
    }
}
