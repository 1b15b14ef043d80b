use super::{expect_pair, expect_text_json, Tagged, TextForm, ToLiteral, TAG_DATETIME};
use crate::cbor::Cbor;
use crate::error::{DecodeError, ProtocolError};
use crate::escape::quote_str;
use crate::value::{mismatch, FromValue, Value};
use chrono::{DateTime, Utc};
use std::fmt;

const NANOS_PER_SEC: i128 = 1_000_000_000;
const TEXT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// A UTC instant with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Datetime(DateTime<Utc>);

impl Datetime {
    /// Builds an instant from seconds and nanoseconds since the Unix epoch.
    ///
    /// Nanoseconds outside `0..1e9` carry into the seconds. Returns `None`
    /// when the instant is outside the representable range.
    pub fn from_parts(secs: i64, nanos: i64) -> Option<Self> {
        let total = i128::from(secs) * NANOS_PER_SEC + i128::from(nanos);
        let secs = i64::try_from(total.div_euclid(NANOS_PER_SEC)).ok()?;
        let nanos = total.rem_euclid(NANOS_PER_SEC) as u32;
        DateTime::from_timestamp(secs, nanos).map(Datetime)
    }

    pub fn now() -> Self {
        Datetime(Utc::now())
    }

    /// Whole seconds since the Unix epoch.
    pub fn seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Nanosecond remainder, always in `0..1e9`.
    pub fn nanos(&self) -> u32 {
        self.0.timestamp_subsec_nanos()
    }

    pub fn as_chrono(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parses an RFC 3339 timestamp in any offset.
    pub fn parse(input: &str) -> Result<Self, DecodeError> {
        DateTime::parse_from_rfc3339(input)
            .map(|dt| Datetime(dt.with_timezone(&Utc)))
            .map_err(|e| DecodeError::InvalidDatetime {
                input: input.to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<DateTime<Utc>> for Datetime {
    fn from(dt: DateTime<Utc>) -> Self {
        Datetime(dt)
    }
}

impl From<Datetime> for DateTime<Utc> {
    fn from(dt: Datetime) -> Self {
        dt.0
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TEXT_FORMAT))
    }
}

impl Tagged for Datetime {
    const TAG: u64 = TAG_DATETIME;
    const NAME: &'static str = "Datetime";

    fn encode_payload(&self) -> Cbor {
        Cbor::Array(vec![
            Cbor::int(self.seconds()),
            Cbor::int(i64::from(self.nanos())),
        ])
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        let (secs, nanos) = expect_pair(Self::NAME, payload)?;
        Datetime::from_parts(secs, nanos).ok_or_else(|| {
            DecodeError::InvalidPayload {
                model: Self::NAME,
                reason: format!("instant out of range: [{secs}, {nanos}]"),
            }
            .into()
        })
    }
}

impl TextForm for Datetime {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.to_string())
    }

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError> {
        let text = expect_text_json(Self::NAME, text)?;
        Ok(Datetime::parse(&text)?)
    }
}

impl ToLiteral for Datetime {
    fn to_literal(&self) -> String {
        format!("d{}", quote_str(&self.to_string()))
    }
}

impl FromValue for Datetime {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Datetime(dt) => Ok(dt),
            Value::String(s) => Ok(Datetime::parse(&s)?),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Datetime {
        Datetime::from_parts(1_717_245_296, 780_123_456).unwrap()
    }

    #[test]
    fn test_text_form() {
        assert_eq!(sample().to_string(), "2024-06-01T12:34:56.780123456Z");
        assert_eq!(
            Datetime::from_parts(0, 0).unwrap().to_string(),
            "1970-01-01T00:00:00.000000000Z"
        );
    }

    #[test]
    fn test_literal() {
        assert_eq!(sample().to_literal(), "d'2024-06-01T12:34:56.780123456Z'");
    }

    #[test]
    fn test_binary_roundtrip() {
        let dt = sample();
        let item = dt.encode_binary();
        assert_eq!(
            item,
            Cbor::tag(
                12,
                Cbor::Array(vec![Cbor::int(1_717_245_296), Cbor::int(780_123_456)])
            )
        );
        assert_eq!(Datetime::decode_binary(item).unwrap(), dt);
    }

    #[test]
    fn test_text_roundtrip() {
        let dt = sample();
        assert_eq!(Datetime::decode_text(dt.encode_text()).unwrap(), dt);
    }

    #[test]
    fn test_pre_epoch_normalizes_nanos() {
        let dt = Datetime::from_parts(0, -1).unwrap();
        assert_eq!(dt.seconds(), -1);
        assert_eq!(dt.nanos(), 999_999_999);
        assert_eq!(dt.to_string(), "1969-12-31T23:59:59.999999999Z");
    }

    #[test]
    fn test_short_payload_defaults_to_zero() {
        let item = Cbor::tag(12, Cbor::Array(vec![Cbor::int(60)]));
        let dt = Datetime::decode_binary(item).unwrap();
        assert_eq!(dt.seconds(), 60);
        assert_eq!(dt.nanos(), 0);
    }

    #[test]
    fn test_parse_offsets() {
        let dt = Datetime::parse("2024-06-01T21:34:56.780123456+09:00").unwrap();
        assert_eq!(dt, sample());
        assert!(Datetime::parse("yesterday").is_err());
    }

    #[test]
    fn test_out_of_range() {
        assert!(Datetime::from_parts(i64::MAX, 0).is_none());
        let item = Cbor::tag(
            12,
            Cbor::Array(vec![Cbor::int(i64::MAX), Cbor::int(0)]),
        );
        assert!(Datetime::decode_binary(item).is_err());
    }
}
