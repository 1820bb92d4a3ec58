//! Embedding generation for semantic search
//!
//! The embedding provider is a remote black box reached over HTTP. This crate
//! defines the provider contract and the Ollama client implementation.

pub mod client;
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use client::OllamaClient;
pub use error::{EmbeddingError, EmbeddingResult};

/// Remote text-to-vector contract
///
/// Implementations return a vector per input text; an empty vector is always
/// an error, never a valid embedding.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] when the server is unreachable, responds
    /// with a non-success status, or produces an empty embedding.
    fn get_embedding(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Whether the embedding server currently answers at all
    ///
    /// Used by health checks; never errors.
    fn is_server_available(&self) -> bool;
}
