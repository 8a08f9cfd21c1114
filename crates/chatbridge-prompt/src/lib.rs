//! System prompt personalization driven by a user's past feedback.

pub mod compose;
pub mod directives;
pub mod error;
pub mod index;
pub mod system;
pub mod template;

pub use compose::{Personalizer, PromptComposed, PromptObserver, TracingObserver, UserIdentity};
pub use directives::Directives;
pub use error::{Error, Result};
pub use index::{BannedWordIndex, UserBannedWords, build_index, scan, write_index};
pub use system::upsert_system_message;
pub use template::render;
