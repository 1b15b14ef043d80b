//! Protocol error types.

use thiserror::Error;

/// Errors raised while turning bytes or generic values back into typed values.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("tag mismatch: expected {expected}, got {actual}")]
    TagMismatch { expected: u64, actual: u64 },

    #[error("unknown tag: {0}")]
    UnknownTag(u64),

    #[error("invalid uuid {input:?}: {reason}")]
    InvalidUuid { input: String, reason: String },

    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid datetime {input:?}: {reason}")]
    InvalidDatetime { input: String, reason: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid {model} payload: {reason}")]
    InvalidPayload { model: &'static str, reason: String },

    #[error("integer out of range: {0}")]
    IntegerOverflow(String),

    #[error("truncated input: need {needed} more bytes")]
    Truncated { needed: usize },

    #[error("unsupported item: major type {major}, additional info {info}")]
    UnsupportedItem { major: u8, info: u8 },

    #[error("trailing bytes after item: {0}")]
    TrailingBytes(usize),

    #[error("invalid UTF-8 in text string")]
    InvalidUtf8,

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}

impl DecodeError {
    pub(crate) fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        DecodeError::TypeMismatch { expected, found }
    }
}

/// Protocol-level errors: envelopes, one-way types and codec failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("{model} cannot be decoded from its text form")]
    UnsupportedDecode { model: &'static str },

    #[error("malformed RPC envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unexpected query status {0:?}")]
    UnexpectedStatus(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Returns whether this error originates from decoding malformed data.
    pub fn is_decode(&self) -> bool {
        matches!(self, ProtocolError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TagMismatch {
            expected: 37,
            actual: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("37"));
        assert!(msg.contains("12"));

        let err = DecodeError::InvalidUuid {
            input: "xyz".to_string(),
            reason: "bad length".to_string(),
        };
        assert!(err.to_string().contains("xyz"));

        let err = DecodeError::Truncated { needed: 4 };
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn test_protocol_error_classification() {
        let err: ProtocolError = DecodeError::UnknownTag(99).into();
        assert!(err.is_decode());
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::UnsupportedDecode { model: "RecordId" };
        assert!(!err.is_decode());
        assert!(err.to_string().contains("RecordId"));

        let err = ProtocolError::UnexpectedStatus("MAYBE".to_string());
        assert!(err.to_string().contains("MAYBE"));
    }
}
