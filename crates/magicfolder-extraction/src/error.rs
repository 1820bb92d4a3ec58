//! Extraction error types

use thiserror::Error;

/// Result type alias for extraction operations
pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Errors from content extraction
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// No registered extractor claims the path; the file is out of scope
    #[error("no suitable content extractor found for '{0}'")]
    Unsupported(String),

    /// The file could not be read
    #[error("could not read file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
