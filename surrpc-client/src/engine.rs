//! RPC engine: connection lifecycle, method dispatch and session mutation.
//!
//! `use`, `let` and `unset` are handled locally. Every other method is
//! forwarded to the server, built from a single session snapshot; the
//! session lock is never held while the transport is in flight.

use crate::error::ClientError;
use crate::method::{Method, Param};
use crate::session::{FieldUpdate, SessionSnapshot, SessionState};
use crate::transport::{Transport, TransportError, TransportRequest};
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use surrpc_protocol::{Formatter, FromValue, Object, RpcRequest, Value};
use tokio::sync::Mutex;

/// State that exists only while connected.
#[derive(Debug)]
struct Connection {
    session: SessionState,
    /// Variables defined with `let`, stored as deep copies.
    vars: DashMap<String, Value>,
}

/// Drives RPC calls over a [`Transport`] using a [`Formatter`].
pub struct Engine {
    formatter: Arc<dyn Formatter>,
    transport: Arc<dyn Transport>,
    conn: RwLock<Option<Arc<Connection>>>,
    /// Serializes connect and close.
    lifecycle: Mutex<()>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("formatter", &self.formatter)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Engine {
    pub fn new(formatter: Arc<dyn Formatter>, transport: Arc<dyn Transport>) -> Self {
        Self {
            formatter,
            transport,
            conn: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    /// Connects to `endpoint`.
    ///
    /// Connecting again to the same endpoint is a no-op; connecting to a
    /// different one while connected fails.
    pub async fn connect(&self, endpoint: &str) -> Result<(), ClientError> {
        let _guard = self.lifecycle.lock().await;

        let connected = self
            .conn
            .read()
            .as_ref()
            .map(|conn| conn.session.endpoint().to_string());
        if let Some(connected) = connected {
            return if connected == endpoint {
                Ok(())
            } else {
                Err(ClientError::EndpointMismatch {
                    requested: endpoint.to_string(),
                    connected,
                })
            };
        }

        tracing::debug!(endpoint, "connecting");
        self.transport
            .connect(endpoint)
            .await
            .map_err(|e| match e {
                TransportError::InvalidEndpoint(reason) => ClientError::Configuration(reason),
                source => ClientError::Transport {
                    summary: format!("connect {endpoint}"),
                    source,
                },
            })?;

        *self.conn.write() = Some(Arc::new(Connection {
            session: SessionState::new(endpoint),
            vars: DashMap::new(),
        }));
        tracing::debug!(endpoint, "connected");
        Ok(())
    }

    /// Closes the connection and clears the session. Closing while
    /// disconnected does nothing.
    pub async fn close(&self) -> Result<(), ClientError> {
        let _guard = self.lifecycle.lock().await;

        let Some(conn) = self.conn.write().take() else {
            return Ok(());
        };
        conn.session.reset();
        conn.vars.clear();
        tracing::debug!(endpoint = conn.session.endpoint(), "closing");

        self.transport
            .close()
            .await
            .map_err(|source| ClientError::Transport {
                summary: "close".to_string(),
                source,
            })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.read().is_some()
    }

    fn connection(&self) -> Result<Arc<Connection>, ClientError> {
        self.conn.read().clone().ok_or(ClientError::NotConnected)
    }

    /// Returns a consistent copy of the session.
    pub fn session(&self) -> Result<SessionSnapshot, ClientError> {
        Ok(self.connection()?.session.snapshot())
    }

    /// Returns the stored value of a `let` variable.
    pub fn variable(&self, name: &str) -> Result<Option<Value>, ClientError> {
        Ok(self
            .connection()?
            .vars
            .get(name)
            .map(|v| v.value().clone()))
    }

    /// Sends `method` and returns the encoded result.
    pub async fn send(&self, method: Method, params: Vec<Param>) -> Result<Bytes, ClientError> {
        let conn = self.connection()?;

        match method {
            Method::Use => self.dispatch_use(&conn, params)?,
            Method::Let => self.dispatch_let(&conn, params)?,
            Method::Unset => self.dispatch_unset(&conn, params)?,
            method => return self.dispatch_rpc(&conn, method, params).await,
        }

        Ok(self.formatter.marshal(&Value::None)?)
    }

    /// Sends `method` and decodes the result into `T`.
    pub async fn call<T: FromValue>(
        &self,
        method: Method,
        params: Vec<Param>,
    ) -> Result<T, ClientError> {
        let data = self.send(method, params).await?;
        Ok(self.formatter.unmarshal_into(&data)?)
    }

    fn dispatch_use(&self, conn: &Connection, params: Vec<Param>) -> Result<(), ClientError> {
        let [ns, db]: [Param; 2] = params.try_into().map_err(|params: Vec<Param>| {
            ClientError::invalid_params(
                "use",
                format!("needs 2 params, but got {}", params.len()),
            )
        })?;

        let ns = field_update("namespace", ns)?;
        let db = field_update("database", db)?;
        tracing::debug!(?ns, ?db, "use");
        conn.session.apply_use(ns, db)
    }

    fn dispatch_let(&self, conn: &Connection, params: Vec<Param>) -> Result<(), ClientError> {
        if params.is_empty() || params.len() > 2 {
            return Err(ClientError::invalid_params(
                "let",
                format!("needs 1 or 2 params, but got {}", params.len()),
            ));
        }

        let mut params = params.into_iter();
        let name = variable_name("let", params.next())?;
        match params.next().unwrap_or_default() {
            Param::Omitted | Param::Present(Value::None) => {
                conn.vars.remove(&name);
            }
            param => {
                let value = param.into_value();
                let cloned = self.formatter.unmarshal(&self.formatter.marshal(&value)?)?;
                conn.vars.insert(name, cloned);
            }
        }
        Ok(())
    }

    fn dispatch_unset(&self, conn: &Connection, params: Vec<Param>) -> Result<(), ClientError> {
        if params.is_empty() {
            return Err(ClientError::invalid_params(
                "unset",
                "needs a param, but got 0",
            ));
        }
        let name = variable_name("unset", params.into_iter().next())?;
        conn.vars.remove(&name);
        Ok(())
    }

    async fn dispatch_rpc(
        &self,
        conn: &Connection,
        method: Method,
        params: Vec<Param>,
    ) -> Result<Bytes, ClientError> {
        let token_param = match method {
            Method::Authenticate => Some(auth_token(&params)?),
            _ => None,
        };

        let snapshot = conn.session.snapshot();
        snapshot.validate()?;

        let mut params: Vec<Value> = params.into_iter().map(Param::into_value).collect();
        while params.last().is_some_and(Value::is_none) {
            params.pop();
        }
        if method == Method::Query {
            merge_variables(conn, &mut params)?;
        }

        let request = RpcRequest::new(method.as_str(), params);
        let body = self.formatter.encode_request(&request)?;
        let request = TransportRequest {
            content_type: self.formatter.content_type(),
            namespace: snapshot.namespace,
            database: snapshot.database,
            token: snapshot.token,
            body,
        };
        let summary = request.summary();

        tracing::debug!(%method, "sending rpc");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| ClientError::Transport { summary, source })?;
        tracing::debug!(%method, status = response.status, "rpc response");

        if !response.is_success() {
            return Err(ClientError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let envelope = self.formatter.decode_response(&response.body)?;
        if let Some(error) = envelope.error {
            return Err(ClientError::Rpc(error));
        }
        let result = match envelope.result {
            Some(result) => result,
            None => self.formatter.marshal(&Value::Null)?,
        };

        match method {
            Method::Signin | Method::Signup => {
                match self.formatter.unmarshal_into::<String>(&result) {
                    Ok(token) => {
                        conn.session.set_token(token);
                        tracing::debug!(%method, "session token stored");
                    }
                    Err(error) => {
                        tracing::warn!(%method, %error, "result is not a token, session unchanged")
                    }
                }
            }
            Method::Authenticate => {
                if let Some(token) = token_param {
                    conn.session.set_token(token);
                }
            }
            Method::Invalidate => conn.session.unset_token(),
            _ => {}
        }

        Ok(result)
    }
}

fn field_update(field: &str, param: Param) -> Result<FieldUpdate, ClientError> {
    match param {
        Param::Omitted | Param::Present(Value::None) => Ok(FieldUpdate::Keep),
        Param::Null | Param::Present(Value::Null) => Ok(FieldUpdate::Clear),
        Param::Present(Value::String(s)) => Ok(FieldUpdate::Set(s)),
        Param::Present(other) => Err(ClientError::invalid_params(
            "use",
            format!("{field} should be a string but got {}", other.kind()),
        )),
    }
}

fn variable_name(method: &str, param: Option<Param>) -> Result<String, ClientError> {
    match param {
        Some(Param::Present(Value::String(name))) => Ok(name),
        other => Err(ClientError::invalid_params(
            method,
            format!(
                "name should be a string but got {}",
                other.unwrap_or_default().into_value().kind()
            ),
        )),
    }
}

fn auth_token(params: &[Param]) -> Result<String, ClientError> {
    match params.first() {
        Some(Param::Present(Value::String(token))) => Ok(token.clone()),
        Some(other) => Err(ClientError::invalid_params(
            "authenticate",
            format!(
                "the token should be a string but got {}",
                other.clone().into_value().kind()
            ),
        )),
        None => Err(ClientError::invalid_params(
            "authenticate",
            "needs 1 param, but got 0",
        )),
    }
}

/// Folds `let` variables into the query's variables; explicit ones win.
fn merge_variables(conn: &Connection, params: &mut Vec<Value>) -> Result<(), ClientError> {
    if conn.vars.is_empty() {
        return Ok(());
    }

    let mut merged: Object = conn
        .vars
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect();

    if params.is_empty() {
        return Err(ClientError::invalid_params("query", "needs a query string"));
    }
    if params.len() == 1 {
        params.push(Value::Null);
    }

    let slot = &mut params[1];
    match *slot {
        Value::None | Value::Null => *slot = Value::Object(merged),
        Value::Object(ref mut explicit) => {
            merged.extend(std::mem::take(explicit));
            *explicit = merged;
        }
        ref other => {
            return Err(ClientError::invalid_params(
                "query",
                format!("variables should be an object but got {}", other.kind()),
            ))
        }
    }
    Ok(())
}
