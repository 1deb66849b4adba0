use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::{msg, AppError, Result};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    query_all, query_one, CLIENT_COLS, HISTORY_ENTRY_COLS, LICENSE_COLS, VALIDATION_EVENT_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Clients ============

pub fn create_client(conn: &Connection, input: &CreateClient) -> Result<Client> {
    if get_client_by_email(conn, &input.email)?.is_some() {
        return Err(AppError::Conflict(msg::CLIENT_EXISTS.into()));
    }

    let id = EntityType::Client.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO clients (id, email, name, status, current_version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.email,
            &input.name,
            ClientStatus::Active.as_ref(),
            &input.current_version,
            now,
            now
        ],
    )?;

    Ok(Client {
        id,
        email: input.email.clone(),
        name: input.name.clone(),
        status: ClientStatus::Active,
        current_version: input.current_version.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_client_by_id(conn: &Connection, id: &str) -> Result<Option<Client>> {
    query_one(
        conn,
        &format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLS),
        &[&id],
    )
}

pub fn get_client_by_email(conn: &Connection, email: &str) -> Result<Option<Client>> {
    query_one(
        conn,
        &format!("SELECT {} FROM clients WHERE email = ?1", CLIENT_COLS),
        &[&email],
    )
}

pub fn update_client_status(conn: &Connection, id: &str, status: ClientStatus) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE clients SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_ref(), now(), id],
    )?;
    Ok(affected > 0)
}

// ============ Licenses ============

pub fn create_license(
    conn: &Connection,
    license_key: &str,
    email: &str,
    machine_code: Option<&str>,
    installed_version: Option<&str>,
) -> Result<License> {
    let id = EntityType::License.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO licenses (id, license_key, email, status, machine_code, installed_version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            license_key,
            email,
            LicenseStatus::Active.as_ref(),
            machine_code,
            installed_version,
            now,
            now
        ],
    )?;

    Ok(License {
        id,
        license_key: license_key.to_string(),
        email: email.to_string(),
        status: LicenseStatus::Active,
        machine_code: machine_code.map(String::from),
        installed_version: installed_version.map(String::from),
        last_validated_at: None,
        revoked: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

pub fn get_license_by_key(conn: &Connection, license_key: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE license_key = ?1", LICENSE_COLS),
        &[&license_key],
    )
}

pub fn get_license_by_ref(conn: &Connection, license_ref: &LicenseRef) -> Result<Option<License>> {
    match license_ref {
        LicenseRef::Id(id) => get_license_by_id(conn, id),
        LicenseRef::Key(key) => get_license_by_key(conn, key),
    }
}

pub fn list_licenses_by_email(conn: &Connection, email: &str) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE email = ?1 ORDER BY created_at ASC",
            LICENSE_COLS
        ),
        &[&email],
    )
}

/// True when a non-revoked license already exists for this exact
/// (email, machine_code) pair. Used to refuse duplicate registrations.
pub fn has_live_license_for_machine(
    conn: &Connection,
    email: &str,
    machine_code: &str,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM licenses WHERE email = ?1 AND machine_code = ?2 AND status != 'revoked'",
        params![email, machine_code],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn update_license_status(conn: &Connection, id: &str, status: LicenseStatus) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_ref(), now(), id],
    )?;
    Ok(affected > 0)
}

/// Stamp the revoked sub-record and flip status in one statement. Returns
/// false when the license was already revoked (no write happens).
pub fn revoke_license(
    conn: &Connection,
    id: &str,
    reason: Option<&str>,
    revoked_by: &str,
) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE licenses
         SET status = 'revoked', revoked_reason = ?1, revoked_at = ?2, revoked_by = ?3, updated_at = ?2
         WHERE id = ?4 AND status != 'revoked'",
        params![reason, now, revoked_by, id],
    )?;
    Ok(affected > 0)
}

/// Trust-on-first-use bind as an atomic conditional update. Returns false
/// when zero rows were affected, i.e. a concurrent validation bound a
/// machine first; the caller re-reads and decides deterministically.
pub fn bind_machine_code(conn: &Connection, id: &str, machine_code: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE licenses SET machine_code = ?1, updated_at = ?2 WHERE id = ?3 AND machine_code IS NULL",
        params![machine_code, now(), id],
    )?;
    Ok(affected > 0)
}

/// Version bookkeeping for a successful validation: update the installed
/// version when presented, and always stamp `last_validated_at`.
pub fn record_validation_success(
    conn: &Connection,
    id: &str,
    installed_version: Option<&str>,
) -> Result<()> {
    let now = now();
    match installed_version {
        Some(version) => conn.execute(
            "UPDATE licenses SET installed_version = ?1, last_validated_at = ?2, updated_at = ?2 WHERE id = ?3",
            params![version, now, id],
        )?,
        None => conn.execute(
            "UPDATE licenses SET last_validated_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?,
    };
    Ok(())
}

// ============ Validation history (audit DB) ============

pub fn append_validation_event(
    conn: &Connection,
    event: &NewValidationEvent<'_>,
) -> Result<ValidationEvent> {
    let id = EntityType::ValidationEvent.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO validation_history (id, license_key, email, machine_code, valid, message, installed_version, license_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            &id,
            event.license_key,
            event.email,
            event.machine_code,
            event.valid as i32,
            event.message,
            event.installed_version,
            event.license_id,
            now
        ],
    )?;

    Ok(ValidationEvent {
        id,
        license_key: event.license_key.to_string(),
        email: event.email.to_string(),
        machine_code: event.machine_code.to_string(),
        valid: event.valid,
        message: event.message.map(String::from),
        installed_version: event.installed_version.map(String::from),
        license_id: event.license_id.map(String::from),
        created_at: now,
    })
}

/// List validation events newest-first, filtered by any combination of
/// license key, email, and license id.
pub fn list_validation_events(
    conn: &Connection,
    license_key: Option<&str>,
    email: Option<&str>,
    license_id: Option<&str>,
    limit: i64,
    skip: i64,
) -> Result<(Vec<ValidationEvent>, i64)> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

    if let Some(ref v) = license_key {
        clauses.push("license_key = ?");
        values.push(v);
    }
    if let Some(ref v) = email {
        clauses.push("email = ?");
        values.push(v);
    }
    if let Some(ref v) = license_id {
        clauses.push("license_id = ?");
        values.push(v);
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM validation_history{}", where_sql),
        rusqlite::params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM validation_history{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        VALIDATION_EVENT_COLS, where_sql
    ))?;
    values.push(&limit);
    values.push(&skip);

    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(values.iter()),
            super::from_row::FromRow::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((rows, total))
}

// ============ Lifecycle history (audit DB) ============

pub fn append_history_entry(
    conn: &Connection,
    entry: &NewHistoryEntry<'_>,
) -> Result<HistoryEntry> {
    let id = EntityType::HistoryEntry.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO lifecycle_history (id, entity_type, entity_id, action, description, old_value, new_value, notes, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            &id,
            entry.entity_type.as_ref(),
            entry.entity_id,
            entry.action,
            &entry.description,
            entry.old_value,
            entry.new_value,
            entry.notes,
            entry.created_by,
            now
        ],
    )?;

    Ok(HistoryEntry {
        id,
        entity_type: entry.entity_type,
        entity_id: entry.entity_id.to_string(),
        action: entry.action.to_string(),
        description: entry.description.clone(),
        old_value: entry.old_value.map(String::from),
        new_value: entry.new_value.map(String::from),
        notes: entry.notes.map(String::from),
        created_by: entry.created_by.map(String::from),
        created_at: now,
    })
}

/// List lifecycle history for one entity, newest-first, paginated.
pub fn list_history_entries(
    conn: &Connection,
    entity_type: EntityKind,
    entity_id: &str,
    limit: i64,
    skip: i64,
) -> Result<(Vec<HistoryEntry>, i64)> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM lifecycle_history WHERE entity_type = ?1 AND entity_id = ?2",
        params![entity_type.as_ref(), entity_id],
        |row| row.get(0),
    )?;

    let rows = query_all(
        conn,
        &format!(
            "SELECT {} FROM lifecycle_history WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4",
            HISTORY_ENTRY_COLS
        ),
        &[&entity_type.as_ref(), &entity_id, &limit, &skip],
    )?;

    Ok((rows, total))
}
