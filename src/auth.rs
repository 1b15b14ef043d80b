//! Credentials for `signin` and `signup`.

use surrpc_protocol::{DecodeError, FromValue, Object, ProtocolError, Value};

const KEY_NAMESPACE: &str = "ns";
const KEY_DATABASE: &str = "db";
const KEY_ACCESS: &str = "ac";
const KEY_USERNAME: &str = "user";
const KEY_PASSWORD: &str = "pass";

fn is_reserved(key: &str) -> bool {
    matches!(
        key,
        KEY_NAMESPACE | KEY_DATABASE | KEY_ACCESS | KEY_USERNAME | KEY_PASSWORD
    )
}

/// Sign-in/sign-up credentials.
///
/// Encodes to an object keyed `ns`, `db`, `ac`, `user`, `pass`; empty fields
/// are left out. Extra `variables` are added alongside, except for keys that
/// collide with the reserved ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Auth {
    pub namespace: String,
    pub database: String,
    pub access: String,
    pub username: String,
    pub password: String,
    pub variables: Object,
}

impl Auth {
    /// Root user.
    pub fn root(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Namespace user.
    pub fn namespace(
        username: impl Into<String>,
        password: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::root(username, password)
        }
    }

    /// Database user.
    pub fn database(
        username: impl Into<String>,
        password: impl Into<String>,
        namespace: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            ..Self::namespace(username, password, namespace)
        }
    }

    /// Record access through the access method `access`.
    pub fn record(
        username: impl Into<String>,
        password: impl Into<String>,
        access: impl Into<String>,
    ) -> Self {
        Self {
            access: access.into(),
            ..Self::root(username, password)
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl From<Auth> for Value {
    fn from(auth: Auth) -> Self {
        let mut obj = Object::new();
        for (key, field) in [
            (KEY_NAMESPACE, auth.namespace),
            (KEY_DATABASE, auth.database),
            (KEY_ACCESS, auth.access),
            (KEY_USERNAME, auth.username),
            (KEY_PASSWORD, auth.password),
        ] {
            if !field.is_empty() {
                obj.insert(key.to_string(), Value::String(field));
            }
        }
        obj.extend(
            auth.variables
                .into_iter()
                .filter(|(key, _)| !is_reserved(key)),
        );
        Value::Object(obj)
    }
}

impl FromValue for Auth {
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(DecodeError::TypeMismatch {
                    expected: "object",
                    found: other.kind(),
                }
                .into())
            }
        };

        let mut auth = Auth::default();
        for (key, value) in obj {
            if !is_reserved(&key) {
                auth.variables.insert(key, value);
                continue;
            }

            let s = match value {
                Value::String(s) => s,
                other => {
                    return Err(DecodeError::InvalidPayload {
                        model: "Auth",
                        reason: format!("cannot cast {key} ({}) to string", other.kind()),
                    }
                    .into())
                }
            };
            match key.as_str() {
                KEY_NAMESPACE => auth.namespace = s,
                KEY_DATABASE => auth.database = s,
                KEY_ACCESS => auth.access = s,
                KEY_USERNAME => auth.username = s,
                _ => auth.password = s,
            }
        }
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_constructors_omit_empty_fields() {
        assert_eq!(keys(&Auth::root("root", "pw").into()), ["pass", "user"]);
        assert_eq!(
            keys(&Auth::namespace("u", "p", "test").into()),
            ["ns", "pass", "user"]
        );
        assert_eq!(
            keys(&Auth::database("u", "p", "test", "test").into()),
            ["db", "ns", "pass", "user"]
        );
        assert_eq!(
            keys(&Auth::record("u", "p", "account").into()),
            ["ac", "pass", "user"]
        );
    }

    #[test]
    fn test_variables_cannot_override_reserved_keys() {
        let auth = Auth::record("tobie", "secret", "account")
            .with_variable("email", "tobie@example.com")
            .with_variable("user", "mallory");

        let value = Value::from(auth);
        let obj = value.as_object().unwrap();
        assert_eq!(obj["user"], Value::from("tobie"));
        assert_eq!(obj["email"], Value::from("tobie@example.com"));
    }

    #[test]
    fn test_revive() {
        let auth = Auth::database("u", "p", "ns", "db").with_variable("age", 42i64);
        let revived = Auth::from_value(auth.clone().into()).unwrap();
        assert_eq!(revived, auth);
    }

    #[test]
    fn test_revive_rejects_non_string_reserved_key() {
        let mut obj = Object::new();
        obj.insert("ns".into(), Value::Int(1));
        let err = Auth::from_value(Value::Object(obj)).unwrap_err();
        assert!(err.to_string().contains("cannot cast ns"));

        assert!(Auth::from_value(Value::Null).is_err());
    }
}
