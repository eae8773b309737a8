//! Error types for mnemos-core.

use thiserror::Error;

use crate::config::ConfigValidationError;

/// Result type alias using mnemos-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced synchronously by the memory subsystem.
///
/// Only configuration and input problems reach callers. Decay and
/// consolidation failures are recorded in tick reports and retried on the
/// next tick.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    // Input errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Lifecycle errors
    #[error("memory coordinator is shutting down")]
    ShuttingDown,
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Check if this error came from configuration validation
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Parse(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
