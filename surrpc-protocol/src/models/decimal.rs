use super::{expect_text, expect_text_json, Tagged, TextForm, ToLiteral, TAG_DECIMAL};
use crate::cbor::Cbor;
use crate::error::ProtocolError;
use crate::value::{mismatch, FromValue, Value};
use std::fmt;

/// An arbitrary-precision decimal, kept as its decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(String);

impl Decimal {
    pub fn new(digits: impl Into<String>) -> Self {
        Decimal(digits.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Tagged for Decimal {
    const TAG: u64 = TAG_DECIMAL;
    const NAME: &'static str = "Decimal";

    fn encode_payload(&self) -> Cbor {
        Cbor::Text(self.0.clone())
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        expect_text(Self::NAME, payload).map(Decimal)
    }
}

impl TextForm for Decimal {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.0.clone())
    }

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError> {
        expect_text_json(Self::NAME, text).map(Decimal)
    }
}

impl ToLiteral for Decimal {
    fn to_literal(&self) -> String {
        format!("{}dec", self.0)
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::String(s) => Ok(Decimal(s)),
            other => Err(mismatch("decimal", &other)),
        }
    }
}
