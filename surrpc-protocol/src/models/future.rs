use super::{expect_text, expect_text_json, Tagged, TextForm, ToLiteral, TAG_FUTURE};
use crate::cbor::Cbor;
use crate::error::ProtocolError;
use crate::value::{mismatch, FromValue, Value};

/// A lazily evaluated expression, `<future> { ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Future(String);

impl Future {
    pub fn new(expr: impl Into<String>) -> Self {
        Future(expr.into())
    }

    pub fn expr(&self) -> &str {
        &self.0
    }
}

impl Tagged for Future {
    const TAG: u64 = TAG_FUTURE;
    const NAME: &'static str = "Future";

    fn encode_payload(&self) -> Cbor {
        Cbor::Text(self.0.clone())
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        expect_text(Self::NAME, payload).map(Future)
    }
}

impl TextForm for Future {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.0.clone())
    }

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError> {
        expect_text_json(Self::NAME, text).map(Future)
    }
}

impl ToLiteral for Future {
    fn to_literal(&self) -> String {
        format!("<future>{{{}}}", self.0)
    }
}

impl FromValue for Future {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Future(f) => Ok(f),
            Value::String(s) => Ok(Future(s)),
            other => Err(mismatch("future", &other)),
        }
    }
}
