mod from_row;
mod schema;
pub mod queries;

pub use from_row::{query_all, query_one, FromRow, CLIENT_COLS, LICENSE_COLS};
pub use schema::{init_audit_db, init_db};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::keys::KeySecret;
use crate::releases::Catalog;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding database pools and shared configuration.
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (clients, licenses)
    pub db: DbPool,
    /// Audit database pool (validation + lifecycle history; separate file to
    /// isolate append-only growth)
    pub audit: DbPool,
    /// Server-held HMAC secret for key derivation
    pub secret: KeySecret,
    /// Release catalog feed
    pub catalog: Catalog,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

/// In-memory pool sharing one connection, for tests and ephemeral runs.
pub fn create_memory_pool() -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::memory();
    Pool::builder().max_size(1).build(manager)
}
