use thiserror::Error;

/// Error kinds surfaced by every layer of the engine, from file primitives
/// up through the query executor. The executor never lets one of these
/// escape as a panic — it renders the `Display` impl into
/// `QueryResult::error_message` (see `query::QueryExecutor::run`).
#[derive(Error, Debug)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt: {0}")]
    Corruption(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Exists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
