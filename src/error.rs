//! Error types shared by the store and command layers.

/// Errors raised below the command boundary.
#[derive(Debug, thiserror::Error)]
pub enum EsgError {
    #[error("DB error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Store lock error")]
    Lock,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<EsgError> for String {
    fn from(err: EsgError) -> Self {
        err.to_string()
    }
}

pub type EsgResult<T> = Result<T, EsgError>;
