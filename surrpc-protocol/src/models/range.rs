use super::{
    payload_literal, Tagged, TextForm, ToLiteral, TAG_BOUND_EXCLUDED, TAG_BOUND_INCLUDED,
    TAG_RANGE,
};
use crate::cbor::Cbor;
use crate::codec::{decode_item, encode_item};
use crate::error::{DecodeError, ProtocolError};
use crate::value::{mismatch, FromValue, Value};

/// One end of a [`Range`].
///
/// Exclusivity is fixed by the constructor and changes only through
/// [`Bound::include`] and [`Bound::exclude`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<T = Value> {
    pub value: T,
    excluded: bool,
}

impl<T> Bound<T> {
    pub fn included(value: T) -> Self {
        Bound {
            value,
            excluded: false,
        }
    }

    pub fn excluded(value: T) -> Self {
        Bound {
            value,
            excluded: true,
        }
    }

    pub fn is_included(&self) -> bool {
        !self.excluded
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn include(&mut self) {
        self.excluded = false;
    }

    pub fn exclude(&mut self) {
        self.excluded = true;
    }

    pub fn into_value(self) -> T {
        self.value
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Bound<U> {
        Bound {
            value: f(self.value),
            excluded: self.excluded,
        }
    }

    fn try_map<U>(
        self,
        f: impl FnOnce(T) -> Result<U, ProtocolError>,
    ) -> Result<Bound<U>, ProtocolError> {
        Ok(Bound {
            value: f(self.value)?,
            excluded: self.excluded,
        })
    }
}

impl<T: Clone + Into<Value>> Bound<T> {
    fn tag(&self) -> u64 {
        if self.excluded {
            TAG_BOUND_EXCLUDED
        } else {
            TAG_BOUND_INCLUDED
        }
    }

    fn encode(&self) -> Cbor {
        Cbor::tag(self.tag(), encode_item(&self.value.clone().into()))
    }
}

impl<T: Clone + Into<Value>> ToLiteral for Bound<T> {
    /// Absent values (`NONE`, `null`) render as nothing.
    fn to_literal(&self) -> String {
        match self.value.clone().into() {
            Value::None | Value::Null => String::new(),
            value => payload_literal(&value),
        }
    }
}

/// A range of values with optional begin and end bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<T = Value> {
    begin: Option<Bound<T>>,
    end: Option<Bound<T>>,
}

impl<T> Range<T> {
    pub fn new(begin: Option<Bound<T>>, end: Option<Bound<T>>) -> Self {
        Range { begin, end }
    }

    /// The range with no bounds, `..`.
    pub fn full() -> Self {
        Range {
            begin: None,
            end: None,
        }
    }

    pub fn begin(&self) -> Option<&Bound<T>> {
        self.begin.as_ref()
    }

    pub fn end(&self) -> Option<&Bound<T>> {
        self.end.as_ref()
    }

    pub fn begin_mut(&mut self) -> Option<&mut Bound<T>> {
        self.begin.as_mut()
    }

    pub fn end_mut(&mut self) -> Option<&mut Bound<T>> {
        self.end.as_mut()
    }

    pub fn into_bounds(self) -> (Option<Bound<T>>, Option<Bound<T>>) {
        (self.begin, self.end)
    }
}

fn decode_bound<T: FromValue>(item: Cbor) -> Result<Option<Bound<T>>, ProtocolError> {
    let (tag, content) = match item {
        Cbor::Null | Cbor::Undefined => return Ok(None),
        Cbor::Tag(tag, content) => (tag, content),
        other => {
            return Err(DecodeError::InvalidPayload {
                model: "Range",
                reason: format!("expected bound, found {}", other.kind()),
            }
            .into())
        }
    };

    let value = T::from_value(decode_item(*content)?)?;
    match tag {
        TAG_BOUND_INCLUDED => Ok(Some(Bound::included(value))),
        TAG_BOUND_EXCLUDED => Ok(Some(Bound::excluded(value))),
        other => Err(DecodeError::InvalidPayload {
            model: "Range",
            reason: format!("invalid bound tag {other}"),
        }
        .into()),
    }
}

impl<T: Clone + Into<Value> + FromValue> Tagged for Range<T> {
    const TAG: u64 = TAG_RANGE;
    const NAME: &'static str = "Range";

    fn encode_payload(&self) -> Cbor {
        let encode = |b: &Option<Bound<T>>| b.as_ref().map_or(Cbor::Null, Bound::encode);
        Cbor::Array(vec![encode(&self.begin), encode(&self.end)])
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        let [begin, end]: [Cbor; 2] = match payload {
            Cbor::Array(items) => items.try_into().map_err(|items: Vec<Cbor>| {
                DecodeError::InvalidPayload {
                    model: Self::NAME,
                    reason: format!("expected 2 bounds, found {}", items.len()),
                }
            })?,
            other => {
                return Err(DecodeError::InvalidPayload {
                    model: Self::NAME,
                    reason: format!("expected array, found {}", other.kind()),
                }
                .into())
            }
        };

        Ok(Range {
            begin: decode_bound(begin)?,
            end: decode_bound(end)?,
        })
    }
}

impl<T: Clone + Into<Value>> TextForm for Range<T> {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.to_literal())
    }

    /// Always fails: the text form is a literal and is not parsed back.
    fn decode_text(_text: serde_json::Value) -> Result<Self, ProtocolError> {
        Err(ProtocolError::UnsupportedDecode { model: "Range" })
    }
}

impl<T: Clone + Into<Value>> ToLiteral for Range<T> {
    fn to_literal(&self) -> String {
        let mut out = String::new();
        if let Some(begin) = &self.begin {
            out.push_str(&begin.to_literal());
            if begin.is_excluded() {
                out.push('>');
            }
        }
        out.push_str("..");
        if let Some(end) = &self.end {
            if end.is_included() {
                out.push('=');
            }
            out.push_str(&end.to_literal());
        }
        out
    }
}

impl<T: Into<Value>> From<Range<T>> for Value {
    fn from(r: Range<T>) -> Self {
        let (begin, end) = r.into_bounds();
        Value::Range(Box::new(Range {
            begin: begin.map(|b| b.map(Into::into)),
            end: end.map(|b| b.map(Into::into)),
        }))
    }
}

impl<T: FromValue> FromValue for Range<T> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Range(r) => {
                let (begin, end) = r.into_bounds();
                Ok(Range {
                    begin: begin.map(|b| b.try_map(T::from_value)).transpose()?,
                    end: end.map(|b| b.try_map(T::from_value)).transpose()?,
                })
            }
            Value::String(_) => Err(ProtocolError::UnsupportedDecode { model: "Range" }),
            other => Err(mismatch("range", &other)),
        }
    }
}
