//! Error types for Anchor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedEntry(detail.into())
    }

    /// Missing resources degrade to defaults; callers branch on this.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}
