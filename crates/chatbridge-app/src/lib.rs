use std::ffi::OsString;
use std::path::PathBuf;

use directories::ProjectDirs;

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "chatbridge";
const APP_NAME: &str = "chatbridge";
const FEEDBACK_DB_FILENAME: &str = "webui.db";
const BANNED_WORDS_FILENAME: &str = "banned_words.json";

/// Overrides the feedback database location.
pub const FEEDBACK_DB_ENV: &str = "CHATBRIDGE_FEEDBACK_DB";
/// Overrides where the banned-word index is written.
pub const BANNED_WORDS_ENV: &str = "CHATBRIDGE_BANNED_WORDS_PATH";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user data directory")]
    MissingUserDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// App-local user data directory (feedback store and index artifact).
pub fn user_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .ok_or(Error::MissingUserDataDir)?;
    Ok(dirs.data_local_dir().to_path_buf())
}

pub fn ensure_user_data_dir() -> Result<PathBuf> {
    let dir = user_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// The feedback store is opened read-only, so the directory is never created.
pub fn feedback_db_path() -> Result<PathBuf> {
    resolve(std::env::var_os(FEEDBACK_DB_ENV), || {
        Ok(user_data_dir()?.join(FEEDBACK_DB_FILENAME))
    })
}

pub fn banned_words_path() -> Result<PathBuf> {
    resolve(std::env::var_os(BANNED_WORDS_ENV), || {
        Ok(ensure_user_data_dir()?.join(BANNED_WORDS_FILENAME))
    })
}

/// A non-empty override wins; otherwise `default` is consulted.
fn resolve(
    override_path: Option<OsString>,
    default: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    match override_path {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => default(),
    }
}
