#[derive(Debug, thiserror::Error)]
pub enum CardWatchError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not extract card information from URL: {0}")]
    Extraction(String),

    #[error("Malformed source payload: {0}")]
    MalformedPayload(String),

    #[error("Unsupported source URL: {0}")]
    UnsupportedSource(String),
}

pub type Result<T> = std::result::Result<T, CardWatchError>;
