//! RPC request and response envelopes.

use crate::error::ProtocolError;
use crate::value::{mismatch, FromValue, Object, Value};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a statement that executed successfully.
pub const STATUS_OK: &str = "OK";

/// Status of a statement that failed.
pub const STATUS_ERR: &str = "ERR";

/// Request envelope: `{method, params}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("method".to_string(), Value::String(self.method.clone()));
        obj.insert("params".to_string(), Value::Array(self.params.clone()));
        Value::Object(obj)
    }
}

impl FromValue for RpcRequest {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => return Err(mismatch("request object", &other)),
        };
        let method = String::from_value(obj.remove("method").unwrap_or_default())?;
        let params = match obj.remove("params") {
            None | Some(Value::None) | Some(Value::Null) => Vec::new(),
            Some(params) => Vec::from_value(params)?,
        };
        Ok(Self { method, params })
    }
}

/// Error object carried in a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("code".to_string(), Value::Int(self.code));
        obj.insert("message".to_string(), Value::String(self.message.clone()));
        Value::Object(obj)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code={})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

impl FromValue for RpcError {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => return Err(mismatch("error object", &other)),
        };
        let code = i64::from_value(obj.remove("code").unwrap_or_default())?;
        let message = String::from_value(obj.remove("message").unwrap_or_default())?;
        Ok(Self { code, message })
    }
}

/// Decoded response envelope. The result stays encoded until the caller
/// knows which type to decode it into.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Encoded `result`; `None` when absent or null.
    pub result: Option<Bytes>,
    pub error: Option<RpcError>,
}

/// One statement of a `query` result, with its payload still encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatement {
    pub status: String,
    pub time: String,
    pub result: Bytes,
}

impl RawStatement {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn is_err(&self) -> bool {
        self.status == STATUS_ERR
    }
}

/// Builder for response envelopes, as a server would send them.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub result: Value,
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
            error: None,
        }
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error: Some(RpcError::new(code, message)),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_value(self) -> Value {
        let mut obj = Object::new();
        match self.error {
            Some(error) => {
                obj.insert("error".to_string(), error.to_value());
            }
            None => {
                obj.insert("result".to_string(), self.result);
            }
        }
        Value::Object(obj)
    }
}

/// Builder for one entry of a `query` result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStatement {
    pub status: String,
    pub time: String,
    pub result: Value,
}

impl QueryStatement {
    pub fn ok(time: impl Into<String>, result: impl Into<Value>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            time: time.into(),
            result: result.into(),
        }
    }

    /// A failed statement; the result is the error message.
    pub fn err(time: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERR.to_string(),
            time: time.into(),
            result: Value::String(message.into()),
        }
    }

    pub fn into_value(self) -> Value {
        let mut obj = Object::new();
        obj.insert("status".to_string(), Value::String(self.status));
        obj.insert("time".to_string(), Value::String(self.time));
        obj.insert("result".to_string(), self.result);
        Value::Object(obj)
    }
}

impl From<QueryStatement> for Value {
    fn from(stmt: QueryStatement) -> Self {
        stmt.into_value()
    }
}

pub(crate) fn missing_field(field: &str) -> ProtocolError {
    ProtocolError::MalformedEnvelope(format!("missing field {field:?}"))
}

pub(crate) fn bad_field(field: &str, err: impl fmt::Display) -> ProtocolError {
    ProtocolError::MalformedEnvelope(format!("field {field:?}: {err}"))
}
