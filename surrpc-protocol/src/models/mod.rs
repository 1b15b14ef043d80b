//! SurrealDB value types that need more than plain JSON to survive a round trip.
//!
//! Every model has three faces:
//! - a binary form: a fixed CBOR tag number wrapping a payload ([`Tagged`])
//! - a generic text form: a plain JSON value ([`TextForm`])
//! - a SurrealQL literal, for display only ([`ToLiteral`])

mod datetime;
mod decimal;
mod duration;
mod future;
mod none;
mod range;
mod record_id;
mod table;
mod uuid;

pub use self::datetime::Datetime;
pub use self::decimal::Decimal;
pub use self::duration::{parse_duration, Duration};
pub use self::future::Future;
pub use self::none::NoneValue;
pub use self::range::{Bound, Range};
pub use self::record_id::RecordId;
pub use self::table::Table;
pub use self::uuid::Uuid;

use crate::cbor::Cbor;
use crate::error::{DecodeError, ProtocolError};
use crate::value::Value;

pub const TAG_NONE: u64 = 6;
pub const TAG_TABLE: u64 = 7;
pub const TAG_RECORD_ID: u64 = 8;
pub const TAG_DECIMAL: u64 = 10;
pub const TAG_DATETIME: u64 = 12;
pub const TAG_DURATION: u64 = 14;
pub const TAG_FUTURE: u64 = 15;
pub const TAG_UUID: u64 = 37;
pub const TAG_RANGE: u64 = 49;
pub const TAG_BOUND_INCLUDED: u64 = 50;
pub const TAG_BOUND_EXCLUDED: u64 = 51;

/// Binary form: a tag number plus a payload item.
pub trait Tagged: Sized {
    const TAG: u64;

    /// Model name used in error messages.
    const NAME: &'static str;

    fn encode_payload(&self) -> Cbor;

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError>;

    fn encode_binary(&self) -> Cbor {
        Cbor::tag(Self::TAG, self.encode_payload())
    }

    fn decode_binary(item: Cbor) -> Result<Self, ProtocolError> {
        match item {
            Cbor::Tag(tag, payload) if tag == Self::TAG => Self::decode_payload(*payload),
            Cbor::Tag(tag, _) => Err(DecodeError::TagMismatch {
                expected: Self::TAG,
                actual: tag,
            }
            .into()),
            other => Err(DecodeError::type_mismatch("tag", other.kind()).into()),
        }
    }
}

/// Generic text form, as carried by the JSON formatter.
pub trait TextForm: Sized {
    fn encode_text(&self) -> serde_json::Value;

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError>;
}

/// SurrealQL source form. Output only; never parsed back.
pub trait ToLiteral {
    fn to_literal(&self) -> String;
}

/// Literal of a generic payload: the value's own literal when it has one,
/// otherwise its compact text form.
pub(crate) fn payload_literal(value: &Value) -> String {
    if value.is_model() {
        value.to_literal()
    } else {
        value.to_text().to_string()
    }
}

pub(crate) fn expect_text(model: &'static str, payload: Cbor) -> Result<String, ProtocolError> {
    match payload {
        Cbor::Text(s) => Ok(s),
        other => Err(DecodeError::InvalidPayload {
            model,
            reason: format!("expected text string, found {}", other.kind()),
        }
        .into()),
    }
}

pub(crate) fn expect_text_json(
    model: &'static str,
    text: serde_json::Value,
) -> Result<String, ProtocolError> {
    match text {
        serde_json::Value::String(s) => Ok(s),
        other => Err(DecodeError::InvalidPayload {
            model,
            reason: format!("expected string, found {}", json_kind(&other)),
        }
        .into()),
    }
}

/// Reads a `[seconds, nanoseconds]` pair; missing trailing elements are zero.
pub(crate) fn expect_pair(model: &'static str, payload: Cbor) -> Result<(i64, i64), ProtocolError> {
    let items = match payload {
        Cbor::Array(items) if items.len() <= 2 => items,
        other => {
            return Err(DecodeError::InvalidPayload {
                model,
                reason: format!("expected [seconds, nanoseconds], found {}", other.kind()),
            }
            .into())
        }
    };

    let mut pair = [0i64; 2];
    for (slot, item) in pair.iter_mut().zip(items) {
        *slot = item.as_i64().ok_or_else(|| DecodeError::InvalidPayload {
            model,
            reason: format!("expected integer, found {}", item.kind()),
        })?;
    }
    Ok((pair[0], pair[1]))
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
