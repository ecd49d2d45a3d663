use thiserror::Error;

/// Engine error taxonomy. Decode failures are not represented here:
/// the classifier is total and malformed structured values fall back
/// to their raw text locally.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or empty required input. Never mutates storage.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Storage-layer failure during a read or write, surfaced with detail.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
