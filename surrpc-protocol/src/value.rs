//! Dynamic value model shared by both formatters.

use crate::error::{DecodeError, ProtocolError};
use crate::models::{
    Datetime, Decimal, Duration, Future, RecordId, Range, Table, TextForm, ToLiteral, Uuid,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Object map. Ordered so that text forms are deterministic.
pub type Object = BTreeMap<String, Value>;

/// A value as exchanged with the database.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SurrealDB `NONE`: the absence of a value.
    #[default]
    None,
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(Object),
    Table(Table),
    RecordId(Box<RecordId>),
    Decimal(Decimal),
    Datetime(Datetime),
    Duration(Duration),
    Future(Future),
    Uuid(Uuid),
    Range(Box<Range>),
}

impl Value {
    /// Returns a short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Table(_) => "table",
            Value::RecordId(_) => "record id",
            Value::Decimal(_) => "decimal",
            Value::Datetime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Future(_) => "future",
            Value::Uuid(_) => "uuid",
            Value::Range(_) => "range",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns whether the value is one of the tagged model types.
    pub fn is_model(&self) -> bool {
        matches!(
            self,
            Value::None
                | Value::Table(_)
                | Value::RecordId(_)
                | Value::Decimal(_)
                | Value::Datetime(_)
                | Value::Duration(_)
                | Value::Future(_)
                | Value::Uuid(_)
                | Value::Range(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Collapses the value to its generic text form. Tagged models become
    /// their text representation; non-finite floats become `null`.
    pub fn to_text(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::None | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|&x| Json::from(x)).collect()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_text).collect()),
            Value::Object(o) => Json::Object(
                o.iter()
                    .map(|(k, v)| (k.clone(), v.to_text()))
                    .collect(),
            ),
            Value::Table(t) => t.encode_text(),
            Value::RecordId(r) => r.encode_text(),
            Value::Decimal(d) => d.encode_text(),
            Value::Datetime(d) => d.encode_text(),
            Value::Duration(d) => d.encode_text(),
            Value::Future(f) => f.encode_text(),
            Value::Uuid(u) => u.encode_text(),
            Value::Range(r) => r.encode_text(),
        }
    }

    /// Builds a value from its generic text form. Strings stay strings;
    /// typed extraction through [`FromValue`] decides how to read them.
    pub fn from_text(text: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match text {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(u)) => Value::UInt(u),
                (None, None) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from_text).collect()),
            Json::Object(o) => Value::Object(
                o.into_iter()
                    .map(|(k, v)| (k, Value::from_text(v)))
                    .collect(),
            ),
        }
    }
}

impl ToLiteral for Value {
    fn to_literal(&self) -> String {
        match self {
            Value::None => "NONE".to_string(),
            Value::Table(t) => t.to_literal(),
            Value::RecordId(r) => r.to_literal(),
            Value::Decimal(d) => d.to_literal(),
            Value::Datetime(d) => d.to_literal(),
            Value::Duration(d) => d.to_literal(),
            Value::Future(f) => f.to_literal(),
            Value::Uuid(u) => u.to_literal(),
            Value::Range(r) => r.to_literal(),
            other => other.to_text().to_string(),
        }
    }
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ProtocolError>;
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> ProtocolError {
    DecodeError::type_mismatch(expected, found.kind()).into()
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(_: Value) -> Result<Self, ProtocolError> {
        Ok(())
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

macro_rules! int_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ProtocolError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i)
                            .map_err(|_| DecodeError::IntegerOverflow(i.to_string()).into()),
                        Value::UInt(u) => <$ty>::try_from(u)
                            .map_err(|_| DecodeError::IntegerOverflow(u.to_string()).into()),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::UInt(v),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::None | Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Object(o) => o
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl<T: FromValue, S: BuildHasher + Default> FromValue for HashMap<String, T, S> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Object(o) => o
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(value.to_text())
    }
}

/// Bridges serde types through the generic text form.
///
/// Tagged models reach the serde type as their text representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> Json<T> {
    /// Serializes the wrapped value into a [`Value`].
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        Ok(Value::from_text(serde_json::to_value(&self.0)?))
    }
}

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(Json(serde_json::from_value(value.to_text())?))
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
    Object => Object,
    Table => Table,
    Decimal => Decimal,
    Datetime => Datetime,
    Duration => Duration,
    Future => Future,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>, S: BuildHasher> From<HashMap<String, T, S>> for Value {
    fn from(map: HashMap<String, T, S>) -> Self {
        Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(text: serde_json::Value) -> Self {
        Value::from_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_to_text_collapses_models() {
        let mut obj = Object::new();
        obj.insert("id".to_string(), Value::Uuid(Uuid::from_bytes([0xab; 16])));
        obj.insert("left".to_string(), Value::None);
        obj.insert("ratio".to_string(), Value::Float(f64::NAN));
        obj.insert("tags".to_string(), vec!["a", "b"].into());

        assert_eq!(
            Value::Object(obj).to_text(),
            json!({
                "id": "abababab-abab-abab-abab-abababababab",
                "left": null,
                "ratio": null,
                "tags": ["a", "b"],
            })
        );
    }

    #[test]
    fn test_from_text() {
        let value = Value::from_text(json!({
            "n": 1,
            "u": u64::MAX,
            "f": 1.5,
            "s": "x",
            "l": [true, null],
        }));
        let obj = value.as_object().unwrap();
        assert_eq!(obj["n"], Value::Int(1));
        assert_eq!(obj["u"], Value::UInt(u64::MAX));
        assert_eq!(obj["f"], Value::Float(1.5));
        assert_eq!(obj["s"], Value::String("x".into()));
        assert_eq!(obj["l"], Value::Array(vec![Value::Bool(true), Value::Null]));
    }

    #[test]
    fn test_typed_extraction() {
        assert_eq!(i32::from_value(Value::Int(7)).unwrap(), 7);
        assert!(u8::from_value(Value::Int(300)).is_err());
        assert!(u32::from_value(Value::Int(-1)).is_err());
        assert_eq!(u64::from_value(Value::UInt(u64::MAX)).unwrap(), u64::MAX);
        assert!(i64::from_value(Value::UInt(u64::MAX)).is_err());
        assert_eq!(Value::from(7u64), Value::Int(7));
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(f64::from_value(Value::Int(2)).unwrap(), 2.0);
        assert_eq!(Option::<String>::from_value(Value::None).unwrap(), None);
        assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Vec::<i64>::from_value(vec![1i64, 2, 3].into()).unwrap(),
            vec![1, 2, 3]
        );

        let err = String::from_value(Value::Int(1)).unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_map_extraction() {
        let mut obj = Object::new();
        obj.insert("a".to_string(), Value::Int(1));
        obj.insert("b".to_string(), Value::Int(2));

        let map = HashMap::<String, i64>::from_value(Value::Object(obj.clone())).unwrap();
        assert_eq!(map["a"], 1);

        let map = BTreeMap::<String, i64>::from_value(Value::Object(obj)).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_json_bridge() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct User {
            name: String,
            age: u32,
        }

        let user = User {
            name: "tai-kun".to_string(),
            age: 30,
        };
        let value = Json(&user).to_value().unwrap();
        assert_eq!(value.as_object().unwrap()["age"], Value::Int(30));

        let Json(back) = Json::<User>::from_value(value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_literal_of_plain_values() {
        assert_eq!(Value::None.to_literal(), "NONE");
        assert_eq!(Value::Int(-3).to_literal(), "-3");
        assert_eq!(Value::from("x").to_literal(), "\"x\"");
        assert_eq!(Value::Null.to_literal(), "null");
    }
}
