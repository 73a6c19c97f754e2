//! Encoding and decoding of leader records.
//!
//! Records are stored as compact JSON objects with the field names `id`,
//! `api_addr` and `addr`. Both store backends share this codec, so a record
//! written through one client is readable through any other.

use snafu::{ResultExt, Snafu};

use crate::record::LeaderRecord;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Decoding failed.
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
}

/// Encodes a leader record to its stored byte form.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode(record: &LeaderRecord) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(record).context(EncodeSnafu)
}

/// Decodes a stored leader record.
///
/// Missing fields decode as empty strings. Unknown fields are ignored.
///
/// # Errors
///
/// Returns `CodecError::Decode` if `bytes` is not valid JSON or does not
/// hold a leader record.
pub fn decode(bytes: &[u8]) -> Result<LeaderRecord, CodecError> {
    serde_json::from_slice(bytes).context(DecodeSnafu)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_full_record() {
        let original = LeaderRecord::new("2", "http://localhost:4003", "localhost:4004");
        let bytes = encode(&original).expect("encode record");
        let decoded = decode(&bytes).expect("decode record");
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_roundtrip_empty_record() {
        let original = LeaderRecord::default();
        let bytes = encode(&original).expect("encode empty record");
        assert_eq!(bytes, b"{}");
        let decoded = decode(&bytes).expect("decode empty record");
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let decoded = decode(br#"{"api_addr":"http://10.0.0.1:4001"}"#).expect("decode");
        assert_eq!(decoded.id, "");
        assert_eq!(decoded.api_addr, "http://10.0.0.1:4001");
        assert_eq!(decoded.addr, "");
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let decoded = decode(br#"{"id":"1","term":7}"#).expect("decode");
        assert_eq!(decoded, LeaderRecord::new("1", "", ""));
    }

    #[test]
    fn test_decode_malformed_input() {
        let result = decode(b"not a leader record");
        let err = result.unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
        assert!(err.to_string().starts_with("Decoding failed:"));
    }

    #[test]
    fn test_decode_wrong_field_type() {
        let result = decode(br#"{"id":42}"#);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_decode_empty_input() {
        let result = decode(&[]);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_decode_json_null() {
        let result = decode(b"null");
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }
}
