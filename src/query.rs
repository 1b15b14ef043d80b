//! Per-statement query results.
//!
//! A `query` RPC answers with one `{status, time, result}` entry per
//! statement. Results stay encoded until extracted, so a statement that is
//! never read is never decoded.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use surrpc_protocol::{Formatter, FromValue, RawStatement, STATUS_ERR, STATUS_OK};

/// One encoded statement result.
#[derive(Clone)]
pub struct QueryResult {
    formatter: Arc<dyn Formatter>,
    data: Bytes,
}

impl QueryResult {
    pub(crate) fn new(formatter: Arc<dyn Formatter>, data: Bytes) -> Self {
        Self { formatter, data }
    }

    /// Decodes the result into `T`.
    pub fn decode<T: FromValue>(&self) -> Result<T> {
        Ok(self.formatter.unmarshal_into(&self.data)?)
    }

    /// Encoded bytes, in the connection's wire format.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("content_type", &self.formatter.content_type())
            .field("len", &self.data.len())
            .finish()
    }
}

/// A statement exactly as the server reported it.
#[derive(Debug, Clone)]
pub struct QueryRawResult {
    pub status: String,
    pub time: String,
    pub result: QueryResult,
}

impl QueryRawResult {
    pub(crate) fn from_statement(formatter: &Arc<dyn Formatter>, stmt: RawStatement) -> Self {
        Self {
            status: stmt.status,
            time: stmt.time,
            result: QueryResult::new(formatter.clone(), stmt.result),
        }
    }
}

/// Results of a query whose statements all succeeded, in statement order.
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    data: Vec<QueryResult>,
}

impl QueryResults {
    /// Collects the results of `statements`, failing on the first `ERR`.
    pub(crate) fn collect(statements: Vec<QueryRawResult>) -> Result<Self> {
        let total = statements.len();
        let mut data = Vec::with_capacity(total);

        for (i, stmt) in statements.into_iter().enumerate() {
            match stmt.status.as_str() {
                STATUS_OK => data.push(stmt.result),
                STATUS_ERR => {
                    let message: String = stmt.result.decode()?;
                    let discarded = total - i - 1;
                    if discarded > 0 {
                        tracing::warn!(
                            statement = i + 1,
                            total,
                            discarded,
                            "query failed, discarding remaining statements"
                        );
                    }
                    return Err(Error::QueryFailed {
                        index: i + 1,
                        total,
                        message,
                    });
                }
                other => {
                    return Err(
                        surrpc_protocol::ProtocolError::UnexpectedStatus(other.to_string()).into(),
                    )
                }
            }
        }

        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes the result at `index` and removes it; later results shift
    /// down by one. Nothing is removed if the index is out of range or the
    /// result fails to decode.
    pub fn remove<T: FromValue>(&mut self, index: usize) -> Result<T> {
        let slot = self.data.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.data.len(),
        })?;
        let value = slot.decode()?;
        self.data.remove(index);
        Ok(value)
    }
}
