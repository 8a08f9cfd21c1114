use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::{Error, Result};
use crate::migration;

pub(crate) struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Opens an existing feedback database without write access. The file is
    /// owned by the web UI, so it is never created or migrated here.
    pub(crate) fn open_read_only(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::StoreNotFound(path.display().to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        configure_read_only(&conn)?;

        Ok(Self { conn })
    }

    pub(crate) fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::apply(&mut conn)?;

        Ok(Self { conn })
    }
}

fn configure_read_only(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA query_only = ON;")?;
    Ok(())
}
