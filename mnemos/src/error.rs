//! Error types for mnemos input handling.

use thiserror::Error;

/// Problems with user-supplied records or embeddings.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("line {line}: invalid record: {message}")]
    Record { line: usize, message: String },

    #[error("invalid embedding value '{value}': expected a float")]
    EmbeddingValue { value: String },

    #[error("embedding must not be empty")]
    EmptyEmbedding,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InputError {
    /// Create a record error for a 1-based line number
    pub fn record(line: usize, message: impl ToString) -> Self {
        Self::Record {
            line,
            message: message.to_string(),
        }
    }
}
