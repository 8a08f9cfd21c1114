use rusqlite::types::Type;
use rusqlite::{Row, params};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The `type` column of a feedback row. Only ratings carry directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackKind {
    Rating,
    Other(String),
}

impl FeedbackKind {
    pub fn as_str(&self) -> &str {
        match self {
            FeedbackKind::Rating => "rating",
            FeedbackKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for FeedbackKind {
    fn from(value: &str) -> Self {
        match value {
            "rating" => FeedbackKind::Rating,
            other => FeedbackKind::Other(other.to_string()),
        }
    }
}

impl From<String> for FeedbackKind {
    fn from(value: String) -> Self {
        FeedbackKind::from(value.as_str())
    }
}

/// One feedback row, flattened from the `data` JSON column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub id: String,
    pub user_id: String,
    pub kind: FeedbackKind,
    /// `-1` is a thumbs-down, `1` a thumbs-up.
    pub rating: Option<i64>,
    pub comment: String,
}

/// The subset of the `data` column this crate understands.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FeedbackData {
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Query filter for [`Feedback::select`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub user_id: Option<String>,
    pub kind: Option<FeedbackKind>,
    pub rating: Option<i64>,
    /// ASCII case-insensitive substring of the comment.
    pub comment_contains: Option<String>,
}

impl FeedbackFilter {
    /// Thumbs-down ratings left by `user_id`.
    pub fn negative_ratings(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            kind: Some(FeedbackKind::Rating),
            rating: Some(-1),
            comment_contains: None,
        }
    }

    pub fn comment_contains(mut self, needle: impl Into<String>) -> Self {
        self.comment_contains = Some(needle.into());
        self
    }

    /// In-memory evaluation with the same semantics as the SQL query.
    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        if let Some(user_id) = &self.user_id
            && record.user_id != *user_id
        {
            return false;
        }
        if let Some(kind) = &self.kind
            && record.kind != *kind
        {
            return false;
        }
        if let Some(rating) = self.rating
            && record.rating != Some(rating)
        {
            return false;
        }
        if let Some(needle) = &self.comment_contains {
            let haystack = record.comment.to_ascii_lowercase();
            if !haystack.contains(&needle.to_ascii_lowercase()) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Read-only view over the `feedback` table.
pub struct Feedback<'db> {
    pub(crate) db: &'db Database,
}

impl Feedback<'_> {
    pub fn select(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, user_id, type, data
             FROM feedback
             WHERE (?1 IS NULL OR user_id = ?1)
               AND (?2 IS NULL OR type = ?2)
               AND (?3 IS NULL OR json_extract(data, '$.rating') = ?3)
               AND (?4 IS NULL OR json_extract(data, '$.comment') LIKE '%' || ?4 || '%' ESCAPE '\\')
             ORDER BY rowid ASC",
        )?;

        let needle = filter.comment_contains.as_deref().map(escape_like);
        let iter = stmt.query_map(
            params![
                filter.user_id,
                filter.kind.as_ref().map(FeedbackKind::as_str),
                filter.rating,
                needle,
            ],
            row_to_record,
        )?;
        collect_rows(iter)
    }

    /// Every record with a non-empty comment, in insertion order.
    pub fn with_comments(&self) -> Result<Vec<FeedbackRecord>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, user_id, type, data
             FROM feedback
             WHERE json_extract(data, '$.comment') IS NOT NULL
               AND json_extract(data, '$.comment') != ''
             ORDER BY rowid ASC",
        )?;

        let iter = stmt.query_map([], row_to_record)?;
        collect_rows(iter)
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        let data = FeedbackData {
            rating: record.rating,
            comment: Some(record.comment.clone()),
        };
        self.insert_raw(
            &record.id,
            &record.user_id,
            record.kind.as_str(),
            &serde_json::to_string(&data)?,
        )
    }

    /// Inserts a row with an arbitrary `data` payload, malformed or not.
    #[cfg(any(test, feature = "test-support"))]
    pub fn insert_raw(&self, id: &str, user_id: &str, kind: &str, data: &str) -> Result<()> {
        self.db.conn.execute(
            "INSERT INTO feedback (id, user_id, version, type, data, meta, snapshot, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4, '{}', '{}', unixepoch(), unixepoch())",
            params![id, user_id, kind, data],
        )?;
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FeedbackRecord> {
    let user_id: Option<String> = row.get(1)?;
    let kind: Option<String> = row.get(2)?;
    let data = parse_data_column(row, 3)?;

    Ok(FeedbackRecord {
        id: row.get(0)?,
        user_id: user_id.unwrap_or_default(),
        kind: FeedbackKind::from(kind.unwrap_or_default()),
        rating: data.rating,
        comment: data.comment.unwrap_or_default(),
    })
}

fn parse_data_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<FeedbackData> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(FeedbackData::default()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn collect_rows<T, F>(iter: rusqlite::MappedRows<'_, F>) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut rows = Vec::new();
    for row in iter {
        rows.push(row.map_err(map_row_error)?);
    }
    Ok(rows)
}

// Surface malformed `data` columns as JSON errors rather than generic SQLite ones.
fn map_row_error(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::FromSqlConversionFailure(idx, ty, source) => {
            match source.downcast::<serde_json::Error>() {
                Ok(json) => Error::Json(*json),
                Err(source) => {
                    Error::Sqlite(rusqlite::Error::FromSqlConversionFailure(idx, ty, source))
                }
            }
        }
        other => Error::Sqlite(other),
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
