use super::{Tagged, TextForm, ToLiteral, TAG_NONE};
use crate::cbor::Cbor;
use crate::error::ProtocolError;
use crate::value::{mismatch, FromValue, Value};

/// The `NONE` value. Distinct from `null`, which the database keeps as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoneValue;

impl Tagged for NoneValue {
    const TAG: u64 = TAG_NONE;
    const NAME: &'static str = "None";

    fn encode_payload(&self) -> Cbor {
        Cbor::Null
    }

    fn decode_payload(_payload: Cbor) -> Result<Self, ProtocolError> {
        Ok(NoneValue)
    }
}

impl TextForm for NoneValue {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn decode_text(_text: serde_json::Value) -> Result<Self, ProtocolError> {
        Ok(NoneValue)
    }
}

impl ToLiteral for NoneValue {
    fn to_literal(&self) -> String {
        "NONE".to_string()
    }
}

impl From<NoneValue> for Value {
    fn from(_: NoneValue) -> Self {
        Value::None
    }
}

impl FromValue for NoneValue {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::None | Value::Null => Ok(NoneValue),
            other => Err(mismatch("none", &other)),
        }
    }
}
