use rusqlite::Connection;

/// Initialize the main database schema (clients and licenses).
///
/// Clients and licenses are independent top-level records correlated only by
/// email; the application layer enforces the correspondence, not a foreign
/// key.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS clients (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            status TEXT NOT NULL CHECK (status IN ('active', 'deactivated')),
            current_version TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_clients_email ON clients(email);

        -- machine_code is nullable and bound at most once (trust-on-first-use);
        -- the revoked_* columns are populated only by the revoke flow
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            license_key TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('active', 'inactive', 'revoked')),
            machine_code TEXT,
            installed_version TEXT,
            last_validated_at INTEGER,
            revoked_reason TEXT,
            revoked_at INTEGER,
            revoked_by TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_email ON licenses(email);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_key ON licenses(license_key);
        "#,
    )?;
    Ok(())
}

/// Initialize the audit database schema (separate DB file).
/// Optimized for an append-only workload with WAL mode.
pub fn init_audit_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: writes are sequential appends, much faster for append-only
    // workloads. synchronous=NORMAL is safe with WAL.
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        -- one row per validation attempt; email is '' when the license
        -- record did not exist
        CREATE TABLE IF NOT EXISTS validation_history (
            id TEXT PRIMARY KEY,
            license_key TEXT NOT NULL,
            email TEXT NOT NULL,
            machine_code TEXT NOT NULL,
            valid INTEGER NOT NULL,
            message TEXT,
            installed_version TEXT,
            license_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_validation_key_time ON validation_history(license_key, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_validation_email_time ON validation_history(email, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_validation_license_time ON validation_history(license_id, created_at DESC);

        -- one row per client/license status transition, including cascades
        CREATE TABLE IF NOT EXISTS lifecycle_history (
            id TEXT PRIMARY KEY,
            entity_type TEXT NOT NULL CHECK (entity_type IN ('client', 'license')),
            entity_id TEXT NOT NULL,
            action TEXT NOT NULL,
            description TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            notes TEXT,
            created_by TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_lifecycle_entity_time ON lifecycle_history(entity_type, entity_id, created_at DESC);
        "#,
    )?;
    Ok(())
}
