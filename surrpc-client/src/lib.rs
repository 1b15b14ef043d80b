//! # surrpc-client
//!
//! RPC engine for SurrealDB over HTTP.
//!
//! This crate provides:
//! - Connection-scoped session state (namespace, database, token)
//! - Method dispatch with local handling of `use`, `let` and `unset`
//! - A transport abstraction with an HTTP implementation
//! - Layered client configuration
//!
//! The `test-util` feature exposes [`MockTransport`](mock::MockTransport), a
//! scripted in-process transport for tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod method;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ConfigError, EndpointTransform, Format};
pub use engine::Engine;
pub use error::{ClientError, ErrorKind};
pub use http::HttpTransport;
pub use method::{Method, Param};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;
pub use session::{FieldUpdate, SessionSnapshot, SessionState};
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse};
