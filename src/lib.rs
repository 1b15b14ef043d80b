//! # surrpc
//!
//! SurrealDB client over the HTTP RPC endpoint.
//!
//! ```no_run
//! use surrpc::{Auth, ClientConfig, Db};
//!
//! # async fn run() -> surrpc::Result<()> {
//! let config = ClientConfig::new("http://127.0.0.1:8000")
//!     .with_namespace("test")
//!     .with_database("test");
//! let db = Db::from_config(&config).await?;
//! db.signin(Auth::root("root", "root")).await?;
//!
//! let mut results = db.query("SELECT * FROM person; RETURN 1", None).await?;
//! let people: Vec<surrpc::Value> = results.remove(0)?;
//! let one: i64 = results.remove(0)?;
//! # let _ = (people, one);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod db;
pub mod endpoint;
pub mod error;
pub mod query;

pub use auth::Auth;
pub use db::Db;
pub use endpoint::normalize_endpoint;
pub use error::{Error, Result};
pub use query::{QueryRawResult, QueryResult, QueryResults};

pub use surrpc_client::{
    ClientConfig, ClientError, ConfigError, EndpointTransform, ErrorKind, Format, HttpTransport,
    Method, Param, SessionSnapshot, Transport,
};
pub use surrpc_protocol::{
    Bound, Datetime, Decimal, Duration, FromValue, Future, Json, NoneValue, Object, Range,
    RecordId, Table, ToLiteral, Uuid, Value,
};
