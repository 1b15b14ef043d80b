use super::{expect_text, expect_text_json, Tagged, TextForm, ToLiteral, TAG_TABLE};
use crate::cbor::Cbor;
use crate::error::ProtocolError;
use crate::escape::quote_ident;
use crate::value::{mismatch, FromValue, Value};
use std::fmt;

/// A table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Table(String);

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Tagged for Table {
    const TAG: u64 = TAG_TABLE;
    const NAME: &'static str = "Table";

    fn encode_payload(&self) -> Cbor {
        Cbor::Text(self.0.clone())
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        expect_text(Self::NAME, payload).map(Table)
    }
}

impl TextForm for Table {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.0.clone())
    }

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError> {
        expect_text_json(Self::NAME, text).map(Table)
    }
}

impl ToLiteral for Table {
    fn to_literal(&self) -> String {
        quote_ident(&self.0)
    }
}

impl FromValue for Table {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Table(t) => Ok(t),
            Value::String(s) => Ok(Table(s)),
            other => Err(mismatch("table", &other)),
        }
    }
}
