//! Content extraction and chunking
//!
//! Extractors turn a file into its content hash plus an ordered list of
//! chunks in a single read. A registry dispatches on the path extension;
//! files no extractor claims are out of scope.

pub mod chunking;
pub mod error;
pub mod markdown;
pub mod plaintext;
pub mod registry;

pub use chunking::{Chunk, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use error::{ExtractorError, ExtractorResult};
pub use markdown::MarkdownExtractor;
pub use plaintext::PlainTextExtractor;
pub use registry::ExtractorRegistry;

use std::path::Path;

use magicfolder_common::FileType;

/// Everything one read of a file yields
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Hex SHA-256 of the decoded text content; empty for an empty file
    pub content_hash: String,
    /// Ordered chunks with dense indices starting at 0
    pub chunks: Vec<Chunk>,
    /// Classification reported by the extractor
    pub file_type: FileType,
}

/// A per-format content extractor
pub trait ContentExtractor: Send + Sync + std::fmt::Debug {
    /// Whether this extractor handles the given path
    fn can_handle(&self, path: &Path) -> bool;

    /// Read the file once, returning hash and chunks together
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Io`] when the file cannot be read.
    fn extract_with_hash(&self, path: &Path) -> ExtractorResult<ExtractedContent>;
}

/// Read a file and decode it to text
///
/// Invalid UTF-8 sequences are replaced rather than failing the read, and
/// CRLF line endings are normalized so the content hash does not depend on
/// the platform that wrote the file.
pub(crate) fn read_text_content(path: &Path) -> ExtractorResult<String> {
    let bytes = std::fs::read(path).map_err(|source| ExtractorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.replace("\r\n", "\n"))
}
