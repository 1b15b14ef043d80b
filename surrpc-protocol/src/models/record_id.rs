use super::{payload_literal, Tagged, TextForm, ToLiteral, TAG_RECORD_ID};
use crate::cbor::Cbor;
use crate::codec::{decode_item, encode_item};
use crate::error::{DecodeError, ProtocolError};
use crate::escape::{quote_rid, quote_str};
use crate::value::{mismatch, FromValue, Value};

/// A record identifier: a table name plus an id of any value type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordId<T = Value> {
    table: String,
    id: T,
}

impl<T> RecordId<T> {
    pub fn new(table: impl Into<String>, id: T) -> Self {
        RecordId {
            table: table.into(),
            id,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id(&self) -> &T {
        &self.id
    }

    pub fn into_parts(self) -> (String, T) {
        (self.table, self.id)
    }
}

impl<T: Clone + Into<Value>> RecordId<T> {
    /// `table:id` with both parts quoted as needed.
    fn joined(&self) -> String {
        let id = self.id.clone().into();
        let id_literal = payload_literal(&id);
        let id_literal = if !id.is_model() && id_literal.starts_with('-') {
            quote_rid(&id_literal)
        } else {
            id_literal
        };
        format!("{}:{}", quote_rid(&self.table), id_literal)
    }

    /// Erases the id type.
    pub fn to_value_id(&self) -> RecordId<Value> {
        RecordId::new(self.table.clone(), self.id.clone().into())
    }
}

impl<T: Clone + Into<Value> + FromValue> Tagged for RecordId<T> {
    const TAG: u64 = TAG_RECORD_ID;
    const NAME: &'static str = "RecordId";

    fn encode_payload(&self) -> Cbor {
        Cbor::Array(vec![
            Cbor::Text(self.table.clone()),
            encode_item(&self.id.clone().into()),
        ])
    }

    fn decode_payload(payload: Cbor) -> Result<Self, ProtocolError> {
        let invalid = |reason: String| DecodeError::InvalidPayload {
            model: Self::NAME,
            reason,
        };

        let [table, id]: [Cbor; 2] = match payload {
            Cbor::Array(items) => items
                .try_into()
                .map_err(|items: Vec<Cbor>| invalid(format!("expected 2 items, found {}", items.len())))?,
            other => return Err(invalid(format!("expected array, found {}", other.kind())).into()),
        };
        let table = match table {
            Cbor::Text(s) => s,
            other => {
                return Err(invalid(format!("expected table name, found {}", other.kind())).into())
            }
        };
        let id = T::from_value(decode_item(id)?)?;
        Ok(RecordId { table, id })
    }
}

impl<T: Clone + Into<Value>> TextForm for RecordId<T> {
    fn encode_text(&self) -> serde_json::Value {
        serde_json::Value::String(self.joined())
    }

    /// Always fails: the text form loses the id's type.
    fn decode_text(_text: serde_json::Value) -> Result<Self, ProtocolError> {
        Err(ProtocolError::UnsupportedDecode { model: "RecordId" })
    }
}

impl<T: Clone + Into<Value>> ToLiteral for RecordId<T> {
    fn to_literal(&self) -> String {
        format!("r{}", quote_str(&self.joined()))
    }
}

impl<T: Into<Value>> From<RecordId<T>> for Value {
    fn from(r: RecordId<T>) -> Self {
        Value::RecordId(Box::new(RecordId::new(r.table, r.id.into())))
    }
}

impl<T: FromValue> FromValue for RecordId<T> {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::RecordId(r) => {
                let (table, id) = r.into_parts();
                Ok(RecordId::new(table, T::from_value(id)?))
            }
            Value::String(_) => Err(ProtocolError::UnsupportedDecode { model: "RecordId" }),
            other => Err(mismatch("record id", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Datetime, Uuid};
    use crate::value::Object;

    #[test]
    fn test_literal_numeric_ids() {
        assert_eq!(RecordId::new("tai-kun", 1i64).to_literal(), "r'⟨tai-kun⟩:1'");
        assert_eq!(RecordId::new("tai-kun", 3.14f64).to_literal(), "r'⟨tai-kun⟩:3.14'");
        assert_eq!(RecordId::new("tai-kun", -1i64).to_literal(), "r'⟨tai-kun⟩:⟨-1⟩'");
    }

    #[test]
    fn test_literal_object_id() {
        let mut id = Object::new();
        id.insert(
            "date".to_string(),
            Datetime::from_parts(1_717_275_600, 0).unwrap().into(),
        );
        id.insert("name".to_string(), "Tokyo".into());
        id.insert("temp".to_string(), 29.6f64.into());

        assert_eq!(
            RecordId::new("city", Value::Object(id)).to_literal(),
            r#"r'city:{"date":"2024-06-01T21:00:00.000000000Z","name":"Tokyo","temp":29.6}'"#
        );
    }

    #[test]
    fn test_literal_model_id() {
        let id = Uuid::parse("26c80163-3b83-481b-93da-c473947cccbc").unwrap();
        assert_eq!(
            RecordId::new("user", id).to_literal(),
            r#"r"user:u'26c80163-3b83-481b-93da-c473947cccbc'""#
        );
    }

    #[test]
    fn test_binary_roundtrip() {
        let rid = RecordId::new("person", "tobie".to_string());
        let item = rid.encode_binary();
        assert_eq!(
            item,
            Cbor::tag(
                8,
                Cbor::Array(vec![Cbor::Text("person".into()), Cbor::Text("tobie".into())])
            )
        );
        assert_eq!(RecordId::<String>::decode_binary(item).unwrap(), rid);
    }

    #[test]
    fn test_binary_roundtrip_nested_model() {
        let rid = RecordId::new("event", Uuid::new_v4());
        let back = RecordId::<Uuid>::decode_binary(rid.encode_binary()).unwrap();
        assert_eq!(back, rid);
    }

    #[test]
    fn test_binary_wrong_id_type() {
        let rid = RecordId::new("person", "tobie".to_string());
        let err = RecordId::<i64>::decode_binary(rid.encode_binary()).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_text_decode_is_unsupported() {
        let rid = RecordId::new("person", 1i64);
        assert_eq!(rid.encode_text(), serde_json::json!("person:1"));
        let err = RecordId::<i64>::decode_text(rid.encode_text()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedDecode { .. }));
    }
}
