//! Binary codec for persisted embeddings.
//!
//! Vectors are stored as packed little-endian `f32` with no per-row length
//! prefix; the dimension is a store-wide constant.

use crate::error::{Error, Result};

/// Serialize an embedding as packed little-endian bytes.
#[must_use]
pub fn embedding_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a packed little-endian embedding, validating the dimension.
pub fn embedding_from_bytes(bytes: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if bytes.len() != dimension * 4 {
        return Err(Error::CorruptEmbedding {
            expected: dimension,
            actual: bytes.len() / 4,
        });
    }

    let mut values = Vec::with_capacity(dimension);
    for chunk in bytes.chunks_exact(4) {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(chunk);
        values.push(f32::from_le_bytes(buf));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let original = vec![0.5, -1.25, 3.75, f32::MIN_POSITIVE];
        let bytes = embedding_to_bytes(&original);
        assert_eq!(bytes.len(), 16);
        let decoded = embedding_from_bytes(&bytes, 4).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let bytes = embedding_to_bytes(&[1.0, 2.0]);
        let err = embedding_from_bytes(&bytes, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::CorruptEmbedding {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_empty_embedding() {
        let bytes = embedding_to_bytes(&[]);
        assert!(bytes.is_empty());
        assert_eq!(embedding_from_bytes(&bytes, 0).unwrap(), Vec::<f32>::new());
    }
}
