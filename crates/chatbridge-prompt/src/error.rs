/// Errors from the offline index job. The live personalization path never
/// returns errors; it logs and degrades to "no directives".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("feedback store error: {0}")]
    Db(#[from] chatbridge_db::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
