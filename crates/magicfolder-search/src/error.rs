//! Search error types

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors surfaced to search callers
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query could not be embedded
    #[error("query embedding failed: {0}")]
    Embedding(#[from] magicfolder_embeddings::EmbeddingError),

    /// The store failed underneath the search
    #[error("search storage error: {0}")]
    Store(#[from] magicfolder_meta_data::MetaDataError),

    /// A stored chunk payload failed to decompress
    #[error("chunk payload error: {0}")]
    Codec(#[from] magicfolder_common::CodecError),
}
