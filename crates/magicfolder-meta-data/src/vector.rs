//! Vector blob encoding
//!
//! Vectors persist as raw little-endian IEEE-754 float32 blobs of exactly
//! `VECTOR_DIM * 4` bytes. Blobs of any other length are treated as absent.

use crate::error::{MetaDataError, MetaDataResult};

/// Fixed embedding dimensionality for the whole store
pub const VECTOR_DIM: usize = 1024;

/// Exact byte length of a valid vector blob
pub const VECTOR_BLOB_LEN: usize = VECTOR_DIM * 4;

/// Check a vector against the store-wide dimensionality
///
/// # Errors
///
/// Returns [`MetaDataError::VectorDimension`] on mismatch.
pub fn validate_dimension(vector: &[f32]) -> MetaDataResult<()> {
    if vector.len() == VECTOR_DIM {
        Ok(())
    } else {
        Err(MetaDataError::VectorDimension {
            expected: VECTOR_DIM,
            actual: vector.len(),
        })
    }
}

/// Encode a validated vector as a little-endian float32 blob
///
/// # Errors
///
/// Returns [`MetaDataError::VectorDimension`] if the vector has the wrong
/// length; nothing is encoded in that case.
pub fn encode_vector(vector: &[f32]) -> MetaDataResult<Vec<u8>> {
    validate_dimension(vector)?;
    let mut blob = Vec::with_capacity(VECTOR_BLOB_LEN);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    Ok(blob)
}

/// Decode a blob back into a vector
///
/// Returns `None` unless the blob is exactly `VECTOR_DIM * 4` bytes.
pub fn decode_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() != VECTOR_BLOB_LEN {
        return None;
    }
    let mut vector = Vec::with_capacity(VECTOR_DIM);
    for bytes in blob.chunks_exact(4) {
        let mut array = [0u8; 4];
        array.copy_from_slice(bytes);
        vector.push(f32::from_le_bytes(array));
    }
    Some(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let vector: Vec<f32> = (0..VECTOR_DIM).map(|i| i as f32 * 0.5).collect();
        let blob = encode_vector(&vector).expect("encode");
        assert_eq!(blob.len(), VECTOR_BLOB_LEN);
        assert_eq!(decode_vector(&blob).expect("decode"), vector);
    }

    #[test]
    fn wrong_dimension_is_rejected_before_encoding() {
        let short = vec![1.0_f32; 3];
        let err = encode_vector(&short).unwrap_err();
        assert!(matches!(
            err,
            MetaDataError::VectorDimension {
                expected: VECTOR_DIM,
                actual: 3
            }
        ));
    }

    #[test]
    fn truncated_blob_decodes_to_none() {
        assert!(decode_vector(&[0u8; 12]).is_none());
        assert!(decode_vector(&[]).is_none());
        assert!(decode_vector(&vec![0u8; VECTOR_BLOB_LEN + 4]).is_none());
    }
}
