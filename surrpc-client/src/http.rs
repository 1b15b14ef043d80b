//! HTTP transport on `reqwest`.

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Url;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends each RPC as a `POST` to the endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: RwLock<Option<Url>>,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: RwLock::new(None),
        })
    }

    /// Checks that `endpoint` is an absolute `http` or `https` URL.
    pub fn parse_endpoint(endpoint: &str) -> Result<Url, TransportError> {
        let url =
            Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(TransportError::InvalidEndpoint(format!(
                "unsupported scheme {scheme:?}"
            ))),
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self, endpoint: &str) -> Result<(), TransportError> {
        let url = Self::parse_endpoint(endpoint)?;
        tracing::debug!(endpoint = %url, "http transport ready");
        *self.endpoint.write() = Some(url);
        Ok(())
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self
            .endpoint
            .read()
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let mut builder = self.client.post(url);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        tracing::debug!(status, len = body.len(), "http response");

        Ok(TransportResponse { status, body })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.endpoint.write().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_parse_endpoint() {
        assert!(HttpTransport::parse_endpoint("http://localhost:8000/rpc").is_ok());
        assert!(HttpTransport::parse_endpoint("https://db.example.com/rpc").is_ok());
        assert!(matches!(
            HttpTransport::parse_endpoint("ws://localhost:8000/rpc"),
            Err(TransportError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            HttpTransport::parse_endpoint("not a url"),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
        let err = transport
            .send(TransportRequest {
                content_type: "application/json",
                namespace: None,
                database: None,
                token: None,
                body: Bytes::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_and_close() {
        let transport = HttpTransport::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
        transport.connect("http://127.0.0.1:8000/rpc").await.unwrap();
        assert!(transport.endpoint.read().is_some());
        transport.close().await.unwrap();
        assert!(transport.endpoint.read().is_none());
    }
}
