//! Object class → observation code resolution.
//!
//! A missing mapping is a normal outcome. Store failures are logged and
//! treated the same way: code suggestion is an enhancement, never a
//! reason to fail an analysis.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

/// Read-only lookup of active mappings, keyed by lower-cased class name.
pub trait MappingStore: Send + Sync {
    fn lookup_active(&self, class_lower: &str) -> Result<Option<String>, DatabaseError>;
}

/// Mapping store backed by the local SQLite database.
pub struct SqliteMappingStore {
    conn: Mutex<Connection>,
}

impl SqliteMappingStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?))
    }
}

impl MappingStore for SqliteMappingStore {
    fn lookup_active(&self, class_lower: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        db::get_active_code(&conn, class_lower)
    }
}

/// Fixed in-memory mapping table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMappingStore {
    codes: HashMap<String, String>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class_name: &str, code: &str) -> Self {
        self.codes
            .insert(db::normalize_class_name(class_name), code.to_string());
        self
    }
}

impl MappingStore for InMemoryMappingStore {
    fn lookup_active(&self, class_lower: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.codes.get(class_lower).cloned())
    }
}

pub struct ObjectCodeResolver {
    store: Box<dyn MappingStore>,
}

impl ObjectCodeResolver {
    pub fn new(store: Box<dyn MappingStore>) -> Self {
        Self { store }
    }

    /// Resolver with no mappings; every lookup yields `None`.
    pub fn empty() -> Self {
        Self::new(Box::new(InMemoryMappingStore::new()))
    }

    pub fn resolve(&self, class_name: &str) -> Option<String> {
        let key = db::normalize_class_name(class_name);
        if key.is_empty() {
            return None;
        }
        match self.store.lookup_active(&key) {
            Ok(code) => {
                tracing::debug!(class = %key, code = ?code, "Object code lookup");
                code
            }
            Err(e) => {
                tracing::warn!(
                    class = %key,
                    error = %e,
                    "Object code lookup failed, suggesting no code"
                );
                None
            }
        }
    }
}
