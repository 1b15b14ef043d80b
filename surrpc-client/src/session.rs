//! Connection-scoped session state.
//!
//! Namespace, database and token live behind a single lock. Anything that
//! needs more than one field reads them through [`SessionState::snapshot`].

use crate::error::ClientError;
use parking_lot::RwLock;

/// A consistent copy of the session, taken under one lock acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub endpoint: String,
    pub namespace: Option<String>,
    pub database: Option<String>,
    pub token: Option<String>,
}

impl SessionSnapshot {
    /// Checks that a database is only selected together with a namespace.
    pub fn validate(&self) -> Result<(), ClientError> {
        check_scope(self.namespace.as_deref(), self.database.as_deref())
    }
}

fn check_scope(namespace: Option<&str>, database: Option<&str>) -> Result<(), ClientError> {
    match (namespace, database) {
        (None, Some(db)) => Err(ClientError::MissingNamespace {
            database: db.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Requested change to one session field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Leave the field as it is.
    Keep,
    /// Unset the field.
    Clear,
    Set(String),
}

impl FieldUpdate {
    fn resolve(&self, current: &Option<String>) -> Option<String> {
        match self {
            FieldUpdate::Keep => current.clone(),
            FieldUpdate::Clear => None,
            FieldUpdate::Set(v) => Some(v.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct Fields {
    namespace: Option<String>,
    database: Option<String>,
    token: Option<String>,
}

/// Session state of one connection.
#[derive(Debug)]
pub struct SessionState {
    endpoint: String,
    fields: RwLock<Fields>,
}

impl SessionState {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fields: RwLock::new(Fields::default()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn namespace(&self) -> Option<String> {
        self.fields.read().namespace.clone()
    }

    pub fn database(&self) -> Option<String> {
        self.fields.read().database.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.fields.read().token.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let fields = self.fields.read();
        SessionSnapshot {
            endpoint: self.endpoint.clone(),
            namespace: fields.namespace.clone(),
            database: fields.database.clone(),
            token: fields.token.clone(),
        }
    }

    pub fn set_namespace(&self, namespace: impl Into<String>) {
        self.fields.write().namespace = Some(namespace.into());
    }

    /// Fails while a database is selected.
    pub fn unset_namespace(&self) -> Result<(), ClientError> {
        let mut fields = self.fields.write();
        check_scope(None, fields.database.as_deref())?;
        fields.namespace = None;
        Ok(())
    }

    /// Fails unless a namespace is selected.
    pub fn set_database(&self, database: impl Into<String>) -> Result<(), ClientError> {
        let database = database.into();
        let mut fields = self.fields.write();
        check_scope(fields.namespace.as_deref(), Some(&database))?;
        fields.database = Some(database);
        Ok(())
    }

    pub fn unset_database(&self) {
        self.fields.write().database = None;
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.fields.write().token = Some(token.into());
    }

    pub fn unset_token(&self) {
        self.fields.write().token = None;
    }

    /// Applies a `use` request: both fields change together or not at all.
    pub fn apply_use(&self, namespace: FieldUpdate, database: FieldUpdate) -> Result<(), ClientError> {
        let mut fields = self.fields.write();
        let ns = namespace.resolve(&fields.namespace);
        let db = database.resolve(&fields.database);
        check_scope(ns.as_deref(), db.as_deref())?;
        fields.namespace = ns;
        fields.database = db;
        Ok(())
    }

    /// Clears every field.
    pub fn reset(&self) {
        *self.fields.write() = Fields::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn test_new_session_is_empty() {
        let session = SessionState::new("http://localhost:8000/rpc");
        assert_eq!(
            session.snapshot(),
            SessionSnapshot {
                endpoint: "http://localhost:8000/rpc".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_database_requires_namespace() {
        let session = SessionState::new("e");
        let err = session.set_database("db").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(session.database(), None);

        session.set_namespace("ns");
        session.set_database("db").unwrap();
        assert_eq!(session.database().as_deref(), Some("db"));

        assert!(session.unset_namespace().is_err());
        assert_eq!(session.namespace().as_deref(), Some("ns"));
        session.unset_database();
        session.unset_namespace().unwrap();
        assert_eq!(session.namespace(), None);
    }

    #[test]
    fn test_apply_use_validates_proposed_state() {
        let session = SessionState::new("e");
        let err = session
            .apply_use(FieldUpdate::Keep, FieldUpdate::Set("db".into()))
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingNamespace { .. }));
        assert_eq!(session.snapshot().namespace, None);
        assert_eq!(session.snapshot().database, None);

        session
            .apply_use(FieldUpdate::Set("ns".into()), FieldUpdate::Set("db".into()))
            .unwrap();

        // Clearing the namespace while keeping the database is rejected whole.
        assert!(session
            .apply_use(FieldUpdate::Clear, FieldUpdate::Keep)
            .is_err());
        let snap = session.snapshot();
        assert_eq!(snap.namespace.as_deref(), Some("ns"));
        assert_eq!(snap.database.as_deref(), Some("db"));

        session
            .apply_use(FieldUpdate::Clear, FieldUpdate::Clear)
            .unwrap();
        assert_eq!(session.snapshot().namespace, None);
    }

    #[test]
    fn test_token_and_reset() {
        let session = SessionState::new("e");
        session.set_namespace("ns");
        session.set_token("secret");
        assert_eq!(session.token().as_deref(), Some("secret"));
        session.unset_token();
        assert_eq!(session.token(), None);

        session.set_token("secret");
        session.reset();
        let snap = session.snapshot();
        assert_eq!(snap.namespace, None);
        assert_eq!(snap.token, None);
        assert_eq!(snap.endpoint, "e");
    }

    #[test]
    fn test_snapshots_are_never_torn() {
        let session = Arc::new(SessionState::new("e"));
        let writer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    let (ns, db) = if i % 2 == 0 {
                        (FieldUpdate::Set(format!("ns{i}")), FieldUpdate::Set(format!("db{i}")))
                    } else {
                        (FieldUpdate::Clear, FieldUpdate::Clear)
                    };
                    session.apply_use(ns, db).unwrap();
                }
            })
        };

        for _ in 0..2_000 {
            let snap = session.snapshot();
            snap.validate().unwrap();
            if let (Some(ns), Some(db)) = (&snap.namespace, &snap.database) {
                assert_eq!(ns.trim_start_matches("ns"), db.trim_start_matches("db"));
            }
        }
        writer.join().unwrap();
    }
}
