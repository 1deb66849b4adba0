//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const CLIENT_COLS: &str =
    "id, email, name, status, current_version, created_at, updated_at";

pub const LICENSE_COLS: &str = "id, license_key, email, status, machine_code, installed_version, last_validated_at, revoked_reason, revoked_at, revoked_by, created_at, updated_at";

pub const VALIDATION_EVENT_COLS: &str =
    "id, license_key, email, machine_code, valid, message, installed_version, license_id, created_at";

pub const HISTORY_ENTRY_COLS: &str = "id, entity_type, entity_id, action, description, old_value, new_value, notes, created_by, created_at";

// ============ FromRow Implementations ============

impl FromRow for Client {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Client {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            current_version: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // The revoked sub-record exists iff revoked_at is set.
        let revoked_reason: Option<String> = row.get(7)?;
        let revoked_at: Option<i64> = row.get(8)?;
        let revoked_by: Option<String> = row.get(9)?;
        let revoked = revoked_at.map(|at| RevokedInfo {
            reason: revoked_reason,
            revoked_at: at,
            revoked_by: revoked_by.unwrap_or_else(|| "system".to_string()),
        });

        Ok(License {
            id: row.get(0)?,
            license_key: row.get(1)?,
            email: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            machine_code: row.get(4)?,
            installed_version: row.get(5)?,
            last_validated_at: row.get(6)?,
            revoked,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl FromRow for ValidationEvent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ValidationEvent {
            id: row.get(0)?,
            license_key: row.get(1)?,
            email: row.get(2)?,
            machine_code: row.get(3)?,
            valid: row.get::<_, i32>(4)? != 0,
            message: row.get(5)?,
            installed_version: row.get(6)?,
            license_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for HistoryEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(HistoryEntry {
            id: row.get(0)?,
            entity_type: parse_enum(row, 1, "entity_type")?,
            entity_id: row.get(2)?,
            action: row.get(3)?,
            description: row.get(4)?,
            old_value: row.get(5)?,
            new_value: row.get(6)?,
            notes: row.get(7)?,
            created_by: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}
