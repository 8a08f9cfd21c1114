mod database;
pub mod error;
pub mod feedback;
mod migration;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use feedback::{Feedback, FeedbackFilter, FeedbackKind, FeedbackRecord};
pub use source::FeedbackSource;
pub use store::Store;
