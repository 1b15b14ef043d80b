//! Top-level error type.

use surrpc_client::{ClientError, ConfigError, ErrorKind};
use surrpc_protocol::ProtocolError;
use thiserror::Error;

/// Result alias for [`Db`](crate::Db) operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("failed to execute query at {index} of {total} statement(s): {message}")]
    QueryFailed {
        index: usize,
        total: usize,
        message: String,
    },

    #[error("failed to remove query result: index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Client(e) => e.kind(),
            Error::Config(_) => ErrorKind::Configuration,
            Error::QueryFailed { .. } => ErrorKind::Protocol,
            Error::IndexOutOfRange { .. } => ErrorKind::Validation,
            Error::Protocol(e) if e.is_decode() => ErrorKind::Decode,
            Error::Protocol(_) => ErrorKind::Protocol,
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Error::Client(ClientError::Configuration(reason.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrpc_protocol::DecodeError;

    #[test]
    fn test_query_failed_message() {
        let err = Error::QueryFailed {
            index: 2,
            total: 3,
            message: "table not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to execute query at 2 of 3 statement(s): table not found"
        );
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_kind_passthrough() {
        assert_eq!(
            Error::from(ClientError::NotConnected).kind(),
            ErrorKind::ConnectionState
        );
        assert_eq!(
            Error::from(ProtocolError::from(DecodeError::InvalidUtf8)).kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            Error::from(ConfigError::ValidationError("x".into())).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::IndexOutOfRange { index: 5, len: 1 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::configuration("bad").kind(), ErrorKind::Configuration);
    }
}
