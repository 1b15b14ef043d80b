use super::{expect_pair, expect_text_json, Tagged, TextForm, ToLiteral, TAG_DURATION};
use crate::cbor::Cbor;
use crate::error::{DecodeError, ProtocolError};
use crate::value::{mismatch, FromValue, Value};
use std::fmt;

const NANOSECOND: i64 = 1;
const MICROSECOND: i64 = 1_000 * NANOSECOND;
const MILLISECOND: i64 = 1_000 * MICROSECOND;
const SECOND: i64 = 1_000 * MILLISECOND;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const YEAR: i64 = 365 * DAY;

/// Units in formatting order, largest first.
const UNITS: [(&str, i64); 9] = [
    ("y", YEAR),
    ("w", WEEK),
    ("d", DAY),
    ("h", HOUR),
    ("m", MINUTE),
    ("s", SECOND),
    ("ms", MILLISECOND),
    ("µs", MICROSECOND),
    ("ns", NANOSECOND),
];

/// A span of time in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    pub fn from_secs(secs: i64) -> Self {
        Duration(secs.saturating_mul(SECOND))
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Converts to a standard duration; negative spans have no equivalent.
    pub fn to_std(&self) -> Option<std::time::Duration> {
        u64::try_from(self.0).ok().map(std::time::Duration::from_nanos)
    }

    fn from_pair(secs: i64, nanos: i64) -> Option<Self> {
        let total = i128::from(secs) * i128::from(SECOND) + i128::from(nanos);
        i64::try_from(total).ok().map(Duration)
    }
}

impl From<std::time::Duration> for Duration {
    /// Saturates at the largest representable span.
    fn from(d: std::time::Duration) -> Self {
        Duration(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 <= 0 {
            return f.write_str("0ns");
        }

        let mut rest = self.0;
        for (unit, size) in UNITS {
            let count = rest / size;
            if count > 0 {
                write!(f, "{count}{unit}")?;
                rest -= count * size;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Duration {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s)
    }
}

fn unit_of(unit: &str) -> Option<(i64, bool)> {
    // (size, counts toward seconds)
    let found = match unit {
        "y" => (YEAR / SECOND, true),
        "w" => (WEEK / SECOND, true),
        "d" => (DAY / SECOND, true),
        "h" => (HOUR / SECOND, true),
        "m" => (MINUTE / SECOND, true),
        "s" => (1, true),
        "ms" => (MILLISECOND, false),
        "us" | "\u{00b5}s" | "\u{03bc}s" => (MICROSECOND, false),
        "ns" => (NANOSECOND, false),
        _ => return None,
    };
    Some(found)
}

/// Parses a duration such as `1h30m` or `1s500ms`.
///
/// Repeated units add up: `1m1m` is two minutes. Seconds and sub-second
/// units are accumulated separately and combined at the end.
pub fn parse_duration(input: &str) -> Result<Duration, DecodeError> {
    let invalid = |reason: &str| DecodeError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() {
        return Err(invalid("empty input"));
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut secs: i64 = 0;
    let mut nanos: i64 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(invalid("expected digits before unit"));
        }
        let (digits, tail) = rest.split_at(digits_end);

        let unit_end = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        if unit_end == 0 {
            return Err(invalid("missing unit"));
        }
        let (unit, tail) = tail.split_at(unit_end);

        let count: i64 = digits.parse().map_err(|_| invalid("number too large"))?;
        let (size, whole_seconds) =
            unit_of(unit).ok_or_else(|| invalid(&format!("unknown unit {unit:?}")))?;

        let slot = if whole_seconds { &mut secs } else { &mut nanos };
        *slot = count
            .checked_mul(size)
            .and_then(|n| slot.checked_add(n))
            .ok_or_else(|| invalid("overflow"))?;

        rest = tail;
    }

    Duration::from_pair(secs, nanos).ok_or_else(|| invalid("overflow"))
}

impl Tagged for Duration {
    const TAG: u64 = TAG_DURATION;
    const NAME: &'static str = "Duration";

    fn encode_payload(&self) -> Cbor {
        Cbor::Array(vec![
            Cbor::int(self.0.div_euclid(SECOND)),
            Cbor::int(self.0.rem_euclid(SECOND)),
        ])
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        let (secs, nanos) = expect_pair(Self::NAME, payload)?;
        Duration::from_pair(secs, nanos).ok_or_else(|| {
            DecodeError::InvalidPayload {
                model: Self::NAME,
                reason: format!("span out of range: [{secs}, {nanos}]"),
            }
            .into()
        })
    }
}

impl TextForm for Duration {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.to_string())
    }

    fn decode_text(text: serde_json::Value) -> Result<Self, ProtocolError> {
        let text = expect_text_json(Self::NAME, text)?;
        Ok(parse_duration(&text)?)
    }
}

impl ToLiteral for Duration {
    fn to_literal(&self) -> String {
        self.to_string()
    }
}

impl FromValue for Duration {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Duration(d) => Ok(d),
            Value::String(s) => Ok(parse_duration(&s)?),
            other => Err(mismatch("duration", &other)),
        }
    }
}
