//! Client error types.

use crate::transport::TransportError;
use surrpc_protocol::{ProtocolError, RpcError};
use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad endpoint or client setup.
    Configuration,
    /// Not connected, or connected to a different endpoint.
    ConnectionState,
    /// Session invariant violation or bad RPC parameters.
    Validation,
    /// Network failure or non-success HTTP status.
    Transport,
    /// RPC error object, malformed envelope, unsupported decode path.
    Protocol,
    /// Malformed encoded data.
    Decode,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::ConnectionState => "connection state",
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected to {connected}, cannot connect to {requested}")]
    EndpointMismatch { requested: String, connected: String },

    #[error("missing namespace: the namespace must be specified before the database {database:?}")]
    MissingNamespace { database: String },

    #[error("{method}: invalid params: {reason}")]
    InvalidParams { method: String, reason: String },

    #[error("failed to send a request ({summary}): {source}")]
    Transport {
        summary: String,
        #[source]
        source: TransportError,
    },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("failed to execute RPC: {0}")]
    Rpc(RpcError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    pub(crate) fn invalid_params(method: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::InvalidParams {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Configuration(_) => ErrorKind::Configuration,
            ClientError::NotConnected | ClientError::EndpointMismatch { .. } => {
                ErrorKind::ConnectionState
            }
            ClientError::MissingNamespace { .. } | ClientError::InvalidParams { .. } => {
                ErrorKind::Validation
            }
            ClientError::Transport { .. } | ClientError::HttpStatus { .. } => ErrorKind::Transport,
            ClientError::Rpc(_) => ErrorKind::Protocol,
            ClientError::Protocol(e) if e.is_decode() => ErrorKind::Decode,
            ClientError::Protocol(_) => ErrorKind::Protocol,
        }
    }

    /// Returns the RPC error object, if the server sent one.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            ClientError::Rpc(e) => Some(e),
            _ => None,
        }
    }
}
