//! Database handle.

use crate::auth::Auth;
use crate::endpoint::normalize_endpoint;
use crate::error::{Error, Result};
use crate::query::{QueryRawResult, QueryResults};
use std::sync::Arc;
use surrpc_client::{
    ClientConfig, EndpointTransform, Engine, HttpTransport, Method, Param, SessionSnapshot,
    Transport,
};
use surrpc_protocol::{Formatter, FromValue, Object, Value};

/// A connection to a SurrealDB server.
///
/// All methods take `&self`; a `Db` can be shared across tasks behind an
/// `Arc`.
#[derive(Debug)]
pub struct Db {
    engine: Engine,
    transform: EndpointTransform,
}

impl Db {
    pub fn new(formatter: Arc<dyn Formatter>, transport: Arc<dyn Transport>) -> Self {
        Self {
            engine: Engine::new(formatter, transport),
            transform: EndpointTransform::default(),
        }
    }

    pub fn with_endpoint_transform(mut self, transform: EndpointTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Builds an HTTP client from `config`, connects and selects the
    /// configured namespace and database.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let transport = HttpTransport::new(config.request_timeout())
            .map_err(|e| Error::configuration(e.to_string()))?;
        let db = Self::new(config.format.formatter(), Arc::new(transport))
            .with_endpoint_transform(config.endpoint_transform);
        db.connect(&config.endpoint).await?;

        if config.namespace.is_some() || config.database.is_some() {
            let ns = config.namespace.clone().map_or(Param::Omitted, Param::from);
            let database = config.database.clone().map_or(Param::Omitted, Param::from);
            db.use_ns_db(ns, database).await?;
        }
        Ok(db)
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        self.engine.formatter()
    }

    /// Connects to `endpoint` after normalizing its path.
    pub async fn connect(&self, endpoint: &str) -> Result<()> {
        let url = normalize_endpoint(endpoint, self.transform)?;
        Ok(self.engine.connect(url.as_str()).await?)
    }

    pub async fn close(&self) -> Result<()> {
        Ok(self.engine.close().await?)
    }

    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    pub fn session(&self) -> Result<SessionSnapshot> {
        Ok(self.engine.session()?)
    }

    /// Selects the namespace and database.
    ///
    /// [`Param::Omitted`] leaves a field unchanged; [`Param::Null`] clears it.
    pub async fn use_ns_db(&self, ns: impl Into<Param>, db: impl Into<Param>) -> Result<()> {
        self.engine
            .send(Method::Use, vec![ns.into(), db.into()])
            .await?;
        Ok(())
    }

    /// Defines a connection variable, sent along with every query.
    pub async fn let_var(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.engine
            .send(Method::Let, vec![name.into(), Param::Present(value.into())])
            .await?;
        Ok(())
    }

    pub async fn unset(&self, name: &str) -> Result<()> {
        self.engine.send(Method::Unset, vec![name.into()]).await?;
        Ok(())
    }

    /// Signs in and returns the session token.
    pub async fn signin(&self, auth: Auth) -> Result<String> {
        self.call(Method::Signin, vec![Value::from(auth).into()])
            .await
    }

    /// Signs up and returns the session token.
    pub async fn signup(&self, auth: Auth) -> Result<String> {
        self.call(Method::Signup, vec![Value::from(auth).into()])
            .await
    }

    pub async fn authenticate(&self, token: impl Into<String>) -> Result<()> {
        let token: String = token.into();
        self.engine
            .send(Method::Authenticate, vec![token.into()])
            .await?;
        Ok(())
    }

    pub async fn invalidate(&self) -> Result<()> {
        self.engine.send(Method::Invalidate, vec![]).await?;
        Ok(())
    }

    /// Returns the record of the signed-in user.
    pub async fn info<T: FromValue>(&self) -> Result<T> {
        self.call(Method::Info, vec![]).await
    }

    pub async fn version(&self) -> Result<String> {
        self.call(Method::Version, vec![]).await
    }

    /// Runs `surql` and returns every statement result, whatever its status.
    pub async fn query_raw(&self, surql: &str, vars: Option<Object>) -> Result<Vec<QueryRawResult>> {
        let vars = vars.map_or(Param::Omitted, |vars| Value::Object(vars).into());
        let data = self
            .engine
            .send(Method::Query, vec![surql.into(), vars])
            .await?;

        let formatter = self.engine.formatter();
        let statements = formatter.decode_statements(&data)?;
        tracing::debug!(statements = statements.len(), "query answered");
        Ok(statements
            .into_iter()
            .map(|stmt| QueryRawResult::from_statement(formatter, stmt))
            .collect())
    }

    /// Runs `surql`. Fails on the first statement with an `ERR` status.
    pub async fn query(&self, surql: &str, vars: Option<Object>) -> Result<QueryResults> {
        QueryResults::collect(self.query_raw(surql, vars).await?)
    }

    /// Sends an arbitrary RPC method.
    pub async fn rpc<T: FromValue>(&self, method: &str, params: Vec<Param>) -> Result<T> {
        self.call(Method::parse(method), params).await
    }

    async fn call<T: FromValue>(&self, method: Method, params: Vec<Param>) -> Result<T> {
        Ok(self.engine.call(method, params).await?)
    }
}
