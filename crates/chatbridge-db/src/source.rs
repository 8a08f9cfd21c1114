//! The query seam the personalization layer reads feedback through.

use crate::error::Result;
use crate::feedback::{FeedbackFilter, FeedbackRecord};
use crate::store::Store;

/// Read-only access to feedback records.
pub trait FeedbackSource {
    fn select_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>>;
}

impl FeedbackSource for Store {
    fn select_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        self.feedback().select(filter)
    }
}

/// A plain record list acts as an in-memory store, in insertion order.
impl FeedbackSource for [FeedbackRecord] {
    fn select_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        Ok(self
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}

impl FeedbackSource for Vec<FeedbackRecord> {
    fn select_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        self.as_slice().select_feedback(filter)
    }
}
