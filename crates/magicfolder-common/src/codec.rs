//! Content-addressable hashing and chunk payload compression
//!
//! Chunk payloads are stored compressed; the codec is a stable byte codec
//! (lossless round-trip, empty input maps to empty output).

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors from the compression codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Compression failed
    #[error("compression failed: {0}")]
    Compress(std::io::Error),

    /// Decompression failed (corrupt or non-zstd input)
    #[error("decompression failed: {0}")]
    Decompress(std::io::Error),
}

/// Default zstd compression level for chunk payloads
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Generate the hex SHA-256 content hash for extracted text
///
/// The hash covers the decoded text content, not the raw file bytes, so equal
/// textual content hashes identically across line-ending normalizations.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compress bytes at the default level
///
/// # Errors
///
/// Returns [`CodecError::Compress`] if the underlying encoder fails.
pub fn compress(data: &[u8]) -> CodecResult<Vec<u8>> {
    compress_with_level(data, DEFAULT_COMPRESSION_LEVEL)
}

/// Compress bytes at an explicit zstd level
///
/// # Errors
///
/// Returns [`CodecError::Compress`] if the underlying encoder fails.
pub fn compress_with_level(data: &[u8], level: i32) -> CodecResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    zstd::encode_all(data, level).map_err(CodecError::Compress)
}

/// Decompress bytes previously produced by [`compress`]
///
/// # Errors
///
/// Returns [`CodecError::Decompress`] if the input is not a valid zstd frame.
pub fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    zstd::decode_all(data).map_err(CodecError::Decompress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_content() {
        let inputs: [&[u8]; 4] = [
            b"",
            b"short",
            b"the quick brown fox jumps over the lazy dog",
            &[0u8; 4096],
        ];
        for input in inputs {
            let compressed = compress(input).expect("compress");
            let restored = decompress(&compressed).expect("decompress");
            assert_eq!(restored, input);
        }
    }

    #[test]
    fn empty_input_round_trips_to_empty() {
        let compressed = compress(b"").expect("compress");
        assert!(compressed.is_empty());
        assert!(decompress(&compressed).expect("decompress").is_empty());
    }

    #[test]
    fn compression_shrinks_repetitive_content() {
        let data = "paragraph ".repeat(500);
        let compressed = compress(data.as_bytes()).expect("compress");
        assert!(compressed.len() < data.len());
    }

    #[test]
    fn hash_is_stable_across_invocations() {
        let content = "# Title\n\nbody\n";
        assert_eq!(hash_content(content), hash_content(content));
    }

    #[test]
    fn hash_differs_for_different_content() {
        assert_ne!(hash_content("alpha"), hash_content("beta"));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = hash_content("");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        // SHA-256 of the empty string is a published constant.
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn decompress_rejects_garbage() {
        assert!(decompress(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
