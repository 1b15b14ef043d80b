//! # surrpc-protocol
//!
//! Value model and wire encodings for the SurrealDB RPC protocol.
//!
//! This crate provides:
//! - The dynamic [`Value`] type and typed extraction through [`FromValue`]
//! - SurrealDB model types with fixed CBOR tag numbers ([`models`])
//! - Quoting rules for SurrealQL literals ([`escape`])
//! - A CBOR item codec and the binary/text [`Formatter`]s
//! - Request/response envelope types

pub mod cbor;
pub mod codec;
pub mod error;
pub mod escape;
pub mod message;
pub mod models;
pub mod value;

pub use codec::{CborFormatter, Formatter, JsonFormatter, CONTENT_TYPE_CBOR, CONTENT_TYPE_JSON};
pub use error::{DecodeError, ProtocolError};
pub use message::{
    QueryStatement, RawResponse, RawStatement, RpcError, RpcRequest, RpcResponse, STATUS_ERR,
    STATUS_OK,
};
pub use models::{
    parse_duration, Bound, Datetime, Decimal, Duration, Future, NoneValue, Range, RecordId, Table,
    ToLiteral, Uuid,
};
pub use value::{FromValue, Json, Object, Value};
