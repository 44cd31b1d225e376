use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::ObjectCodeMapping;

/// Lookup key for a class name: trimmed and lower-cased.
pub fn normalize_class_name(class_name: &str) -> String {
    class_name.trim().to_lowercase()
}

/// Insert or replace the mapping for a class name.
pub fn upsert_mapping(
    conn: &Connection,
    class_name: &str,
    observation_code: &str,
    is_active: bool,
) -> Result<(), DatabaseError> {
    let key = normalize_class_name(class_name);
    let code = observation_code.trim();
    if key.is_empty() || code.is_empty() {
        return Err(DatabaseError::ConstraintViolation(
            "class name and observation code must be non-empty".into(),
        ));
    }
    conn.execute(
        "INSERT INTO object_code_mappings (id, class_name, observation_code, is_active, updated_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT(class_name) DO UPDATE SET
            observation_code = ?3,
            is_active = ?4,
            updated_at = datetime('now')",
        params![Uuid::new_v4().to_string(), key, code, is_active],
    )?;
    Ok(())
}

/// Active observation code for a class name, case-insensitive. `None` if
/// unmapped or inactive.
pub fn get_active_code(
    conn: &Connection,
    class_name: &str,
) -> Result<Option<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT observation_code FROM object_code_mappings
         WHERE class_name = ?1 AND is_active = 1
         LIMIT 1",
    )?;
    match stmt.query_row([normalize_class_name(class_name)], |row| row.get::<_, String>(0)) {
        Ok(code) => Ok(Some(code)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// All mappings, ordered by class name.
pub fn list_mappings(conn: &Connection) -> Result<Vec<ObjectCodeMapping>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, class_name, observation_code, is_active, updated_at
         FROM object_code_mappings ORDER BY class_name",
    )?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        Ok(ObjectCodeMapping {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            class_name: row.get(1)?,
            observation_code: row.get(2)?,
            is_active: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Toggle a mapping without deleting it.
pub fn set_mapping_active(
    conn: &Connection,
    class_name: &str,
    is_active: bool,
) -> Result<(), DatabaseError> {
    let key = normalize_class_name(class_name);
    let changed = conn.execute(
        "UPDATE object_code_mappings SET is_active = ?2, updated_at = datetime('now')
         WHERE class_name = ?1",
        params![key, is_active],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "ObjectCodeMapping".into(),
            id: key,
        });
    }
    Ok(())
}

/// Remove a mapping. Returns whether a row was deleted.
pub fn delete_mapping(conn: &Connection, class_name: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM object_code_mappings WHERE class_name = ?1",
        params![normalize_class_name(class_name)],
    )?;
    Ok(changed > 0)
}
