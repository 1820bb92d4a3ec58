//! Error types for embedding generation

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors from the embedding client
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Could not build the HTTP client
    #[error("failed to construct embedding client: {0}")]
    Client(String),

    /// Transport-level failure talking to the embedding server
    #[error("embedding request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("embedding server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// The response body did not match the expected shape
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    /// The server produced an empty embedding vector
    #[error("received empty embedding vector")]
    EmptyEmbedding,
}
