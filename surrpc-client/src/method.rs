//! RPC methods and their parameters.

use std::fmt;
use surrpc_protocol::Value;

/// An RPC method. Methods with local side effects get their own variant;
/// everything else is forwarded as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Use,
    Let,
    Unset,
    Query,
    Signin,
    Signup,
    Authenticate,
    Invalidate,
    Info,
    Version,
    Other(String),
}

impl Method {
    pub fn parse(name: &str) -> Self {
        match name {
            "use" => Method::Use,
            "let" => Method::Let,
            "unset" => Method::Unset,
            "query" => Method::Query,
            "signin" => Method::Signin,
            "signup" => Method::Signup,
            "authenticate" => Method::Authenticate,
            "invalidate" => Method::Invalidate,
            "info" => Method::Info,
            "version" => Method::Version,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Use => "use",
            Method::Let => "let",
            Method::Unset => "unset",
            Method::Query => "query",
            Method::Signin => "signin",
            Method::Signup => "signup",
            Method::Authenticate => "authenticate",
            Method::Invalidate => "invalidate",
            Method::Info => "info",
            Method::Version => "version",
            Method::Other(name) => name,
        }
    }

    /// Whether the method is handled without contacting the server.
    pub fn is_local(&self) -> bool {
        matches!(self, Method::Use | Method::Let | Method::Unset)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        Method::parse(name)
    }
}

/// One RPC parameter.
///
/// `Omitted` means "nothing supplied" and is distinct from an explicit
/// `Null`: for `use` it keeps a field, where `Null` clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Param {
    #[default]
    Omitted,
    Null,
    Present(Value),
}

impl Param {
    /// Collapses the parameter into the value sent on the wire.
    pub fn into_value(self) -> Value {
        match self {
            Param::Omitted => Value::None,
            Param::Null => Value::Null,
            Param::Present(v) => v,
        }
    }

    pub fn is_omitted(&self) -> bool {
        matches!(self, Param::Omitted)
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Present(value)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Present(Value::from(s))
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Present(Value::String(s))
    }
}

impl From<Option<&str>> for Param {
    /// `None` becomes an explicit `Null`.
    fn from(s: Option<&str>) -> Self {
        s.map_or(Param::Null, Param::from)
    }
}

impl From<Option<String>> for Param {
    /// `None` becomes an explicit `Null`.
    fn from(s: Option<String>) -> Self {
        s.map_or(Param::Null, Param::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_roundtrip() {
        for name in [
            "use",
            "let",
            "unset",
            "query",
            "signin",
            "signup",
            "authenticate",
            "invalidate",
            "info",
            "version",
            "select",
        ] {
            assert_eq!(Method::parse(name).as_str(), name);
        }
        assert_eq!(Method::from("select"), Method::Other("select".into()));
        assert!(Method::Use.is_local());
        assert!(!Method::Query.is_local());
    }

    #[test]
    fn test_param_states() {
        assert_eq!(Param::from(None::<&str>), Param::Null);
        assert_eq!(Param::from(Some("ns")), Param::Present(Value::from("ns")));
        assert!(Param::default().is_omitted());
        assert_eq!(Param::Omitted.into_value(), Value::None);
        assert_eq!(Param::Null.into_value(), Value::Null);
    }
}
