//! Error types shared across filesearch crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, FileSearchError>;

/// Validation and decoding errors raised before any network I/O happens
#[derive(Error, Debug)]
pub enum FileSearchError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid chunking config: {0}")]
    InvalidChunking(String),

    #[error("Invalid custom metadata: {0}")]
    InvalidMetadata(String),
}

impl FileSearchError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
