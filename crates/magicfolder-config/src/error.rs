//! Configuration error types

use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
///
/// All of these are fatal at startup; there is no fallback configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The config file is not valid JSON
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    /// A setting failed validation
    #[error("invalid configuration: {0}")]
    Validation(String),
}
