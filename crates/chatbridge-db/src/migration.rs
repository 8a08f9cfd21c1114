use rusqlite::Connection;

use crate::error::Result;

/// `(user_version after the step, schema script)`, in ascending order.
///
/// Only applied to stores this crate creates itself (in-memory fakes). The
/// production feedback schema belongs to the web UI.
const FEEDBACK_SCHEMA: &[(i64, &str)] = &[(1, include_str!("../migrations/0001_feedback.sql"))];

fn schema_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Brings a fresh store up to the latest feedback schema. Returns how many
/// scripts ran.
pub(crate) fn apply(conn: &mut Connection) -> Result<usize> {
    let current = schema_version(conn)?;
    let pending = FEEDBACK_SCHEMA
        .iter()
        .filter(|(version, _)| *version > current);

    let mut applied = 0;
    for &(version, script) in pending {
        let tx = conn.transaction()?;
        tx.execute_batch(script)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
        tx.commit()?;
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_once_and_records_version() {
        let mut conn = Connection::open_in_memory().expect("open");

        assert_eq!(apply(&mut conn).expect("first run"), 1);
        assert_eq!(schema_version(&conn).expect("version"), 1);
        assert_eq!(apply(&mut conn).expect("second run"), 0);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'feedback'",
                [],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(tables, 1);
    }
}
