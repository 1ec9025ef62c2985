use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Underspecified question: {0}")]
    Underspecified(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unsafe SQL rejected: {0}")]
    UnsafeSql(String),

    #[error("Invalid policy constraint: {0}")]
    InvalidConstraint(String),

    #[error("Policy value extraction failed: {0}")]
    Extraction(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Collaborator timed out: {0}")]
    Timeout(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Memory store error: {0}")]
    Memory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
