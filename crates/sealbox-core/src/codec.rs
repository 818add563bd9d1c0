//! CBOR encoding for every record placed in the store.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CoreError, Result};

/// Serialize a value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlobId;

    #[test]
    fn test_garbage_fails_to_decode() {
        let result: Result<Vec<BlobId>> = from_cbor(b"\xff\x00garbage");
        assert!(matches!(result, Err(CoreError::DecodingError(_))));
    }

    #[test]
    fn test_id_list_roundtrip() {
        let ids = vec![BlobId::random(), BlobId::random()];
        let bytes = to_cbor(&ids).unwrap();
        let recovered: Vec<BlobId> = from_cbor(&bytes).unwrap();
        assert_eq!(ids, recovered);
    }
}
