//! In-process transport that replays scripted responses.

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Records every request and answers from a queue.
///
/// Sending with an empty queue fails with [`TransportError::Request`].
#[derive(Debug, Default)]
pub struct MockTransport {
    endpoint: Mutex<Option<String>>,
    requests: Mutex<Vec<TransportRequest>>,
    replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and body.
    pub fn reply(&self, status: u16, body: impl Into<Bytes>) {
        self.replies.lock().push_back(Ok(TransportResponse {
            status,
            body: body.into(),
        }));
    }

    /// Queues a transport failure.
    pub fn fail(&self, error: TransportError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn endpoint(&self) -> Option<String> {
        self.endpoint.lock().clone()
    }

    /// Number of queued replies not yet consumed.
    pub fn pending(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, endpoint: &str) -> Result<(), TransportError> {
        *self.endpoint.lock() = Some(endpoint.to_string());
        Ok(())
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".to_string())))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.endpoint.lock().take();
        Ok(())
    }
}
