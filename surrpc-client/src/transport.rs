//! The transport abstraction: one request in, one response out.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_NAMESPACE: &str = "Surreal-NS";
pub const HEADER_DATABASE: &str = "Surreal-DB";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

/// Transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("transport not connected")]
    NotConnected,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),
}

/// An encoded RPC request plus the session fields that become headers.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub content_type: &'static str,
    pub namespace: Option<String>,
    pub database: Option<String>,
    pub token: Option<String>,
    pub body: Bytes,
}

impl TransportRequest {
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (HEADER_ACCEPT, self.content_type.to_string()),
            (HEADER_CONTENT_TYPE, self.content_type.to_string()),
        ];
        if let Some(ns) = &self.namespace {
            headers.push((HEADER_NAMESPACE, ns.clone()));
        }
        if let Some(db) = &self.database {
            headers.push((HEADER_DATABASE, db.clone()));
        }
        if let Some(token) = &self.token {
            headers.push((HEADER_AUTHORIZATION, format!("Bearer {token}")));
        }
        headers
    }

    /// Header summary for error messages, with the token masked.
    pub fn summary(&self) -> String {
        let mut summary = format!("content-type={}", self.content_type);
        if let Some(ns) = &self.namespace {
            summary.push_str(",ns=");
            summary.push_str(ns);
        }
        if let Some(db) = &self.database {
            summary.push_str(",db=");
            summary.push_str(db);
        }
        if self.token.is_some() {
            summary.push_str(",tk=***");
        }
        summary
    }
}

/// Raw response: status code and body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries encoded requests to the server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepares the transport for `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<(), TransportError>;

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}
