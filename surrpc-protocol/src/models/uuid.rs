use super::{expect_text_json, Tagged, TextForm, ToLiteral, TAG_UUID};
use crate::cbor::Cbor;
use crate::error::{DecodeError, ProtocolError};
use crate::escape::quote_str;
use crate::value::{mismatch, FromValue, Value};
use std::fmt;

/// A 128-bit UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uuid(::uuid::Uuid);

impl Uuid {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Uuid(::uuid::Uuid::from_bytes(bytes))
    }

    /// Generates a random (version 4) UUID.
    pub fn new_v4() -> Self {
        Uuid(::uuid::Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parses the hyphenated `8-4-4-4-12` hex form. The braced, URN and
    /// unhyphenated forms are accepted too.
    pub fn parse(input: &str) -> Result<Self, DecodeError> {
        ::uuid::Uuid::parse_str(input)
            .map(Uuid)
            .map_err(|e| DecodeError::InvalidUuid {
                input: input.to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<::uuid::Uuid> for Uuid {
    fn from(u: ::uuid::Uuid) -> Self {
        Uuid(u)
    }
}

impl From<Uuid> for ::uuid::Uuid {
    fn from(u: Uuid) -> Self {
        u.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl std::str::FromStr for Uuid {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse(s)
    }
}

impl Tagged for Uuid {
    const TAG: u64 = TAG_UUID;
    const NAME: &'static str = "UUID";

    fn encode_payload(&self) -> Cbor {
        Cbor::Bytes(self.as_bytes().to_vec())
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        let invalid = |reason: String| DecodeError::InvalidPayload {
            model: Self::NAME,
            reason,
        };
        match payload {
            Cbor::Bytes(bytes) => {
                let len = bytes.len();
                let bytes: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| invalid(format!("expected 16 bytes, found {len}")))?;
                Ok(Uuid::from_bytes(bytes))
            }
            other => Err(invalid(format!("expected byte string, found {}", other.kind())).into()),
        }
    }
}

impl TextForm for Uuid {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.to_string())
    }

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError> {
        let text = expect_text_json(Self::NAME, text)?;
        Ok(Uuid::parse(&text)?)
    }
}

impl ToLiteral for Uuid {
    fn to_literal(&self) -> String {
        format!("u{}", quote_str(&self.to_string()))
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::String(s) => Ok(Uuid::parse(&s)?),
            other => Err(mismatch("uuid", &other)),
        }
    }
}
