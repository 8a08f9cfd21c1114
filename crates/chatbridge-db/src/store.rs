use std::path::Path;

use crate::database::Database;
use crate::error::Result;
use crate::feedback::Feedback;

pub struct Store {
    db: Database,
}

impl Store {
    /// Opens the web UI database read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: Database::open_read_only(path.as_ref())?,
        })
    }

    /// A fresh, writable store with the feedback schema applied.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    pub fn feedback(&self) -> Feedback<'_> {
        Feedback { db: &self.db }
    }
}
