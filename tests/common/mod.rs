//! Test utilities and fixtures for Keygate integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

pub use keygate::db::{create_memory_pool, init_audit_db, init_db, queries, AppState};
pub use keygate::handlers::admin::{
    create_client, list_history, list_validation_history, revoke_license, update_client_status,
    update_license_status,
};
pub use keygate::handlers::public::{
    generate_license, list_versions, migration_assets, register_license, validate_license,
    verify_license, version_asset,
};
pub use keygate::keys::{self, KeySecret};
pub use keygate::models::*;
pub use keygate::releases::{Catalog, Release, ReleaseAsset};

/// Fixed secret so keys are reproducible across a test.
pub fn test_secret() -> KeySecret {
    KeySecret::new(&b"test-license-secret"[..])
}

/// A small fixed release feed, descending by recency like the real one.
pub fn test_catalog() -> Catalog {
    let asset = |name: &str, url: &str| ReleaseAsset {
        name: name.to_string(),
        browser_download_url: Some(url.to_string()),
        size: Some(4096),
    };
    let release = |tag: &str, assets: Vec<ReleaseAsset>| Release {
        tag_name: tag.to_string(),
        assets,
        published_at: Some("2024-06-01T00:00:00Z".to_string()),
        prerelease: false,
        draft: false,
        body: Some("notes".to_string()),
        html_url: None,
    };

    Catalog::Fixed(vec![
        release(
            "v2.1.0",
            vec![
                asset("app-2.1.0-setup.exe", "https://dl.test/2.1.0.exe"),
                asset("app-2.1.0.dmg", "https://dl.test/2.1.0.dmg"),
                asset("migrationScriptUrl-2.1.0.sql", "https://dl.test/mig-2.1.0.sql"),
            ],
        ),
        release(
            "v2.0.0",
            vec![asset("app-2.0.0-setup.exe", "https://dl.test/2.0.0.exe")],
        ),
        release(
            "v1.9.0",
            vec![
                asset("app-1.9.0.AppImage", "https://dl.test/1.9.0"),
                asset("migrationScriptUrl-1.9.0.sql", "https://dl.test/mig-1.9.0.sql"),
            ],
        ),
    ])
}

/// Create an AppState for testing with in-memory databases.
///
/// Pools are capped at one connection so every query in a test sees the same
/// in-memory database.
pub fn create_test_app_state() -> AppState {
    let pool = create_memory_pool().unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let audit_pool = create_memory_pool().unwrap();
    {
        let conn = audit_pool.get().unwrap();
        init_audit_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        audit: audit_pool,
        secret: test_secret(),
        catalog: test_catalog(),
    }
}

/// Create a Router with all endpoints (without rate limiting for tests)
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/license/generate", post(generate_license))
        .route("/license/register", post(register_license))
        .route("/license/validate", post(validate_license))
        .route("/license/verify", post(verify_license))
        .route("/version/list", get(list_versions))
        .route("/version", get(version_asset))
        .route("/migration", get(migration_assets))
        .route("/clients", post(create_client))
        .route("/clients/{client_id}/status", patch(update_client_status))
        .route("/licenses/status", patch(update_license_status))
        .route("/licenses/revoke", post(revoke_license))
        .route("/history", get(list_history))
        .route("/validation-history", get(list_validation_history))
        .with_state(state)
}

/// Create a test client with default values.
pub fn create_test_client(conn: &rusqlite::Connection, email: &str) -> Client {
    queries::create_client(
        conn,
        &CreateClient {
            email: email.to_string(),
            name: Some(format!("Test Client {}", email)),
            current_version: None,
        },
    )
    .expect("Failed to create test client")
}

/// Issue a key and persist a license. `machine_code = None` leaves the
/// license unbound for trust-on-first-use tests.
pub fn create_test_license(
    conn: &rusqlite::Connection,
    email: &str,
    machine_code: Option<&str>,
) -> (License, String) {
    let key = keys::generate_key(&test_secret(), email, machine_code.unwrap_or("MC-1"));
    let license = queries::create_license(conn, &key, email, machine_code, None)
        .expect("Failed to create test license");
    (license, key)
}

/// POST a JSON body and return (status, parsed response body).
pub async fn post_json(
    app: Router,
    uri: &str,
    body: Value,
) -> (axum::http::StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    split_response(response).await
}

/// PATCH a JSON body, optionally with an `x-admin-name` header.
pub async fn patch_json(
    app: Router,
    uri: &str,
    body: Value,
    actor: Option<&str>,
) -> (axum::http::StatusCode, Value) {
    let mut builder = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-admin-name", actor);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    split_response(response).await
}

/// GET a URI and return (status, parsed response body).
pub async fn get_json(app: Router, uri: &str) -> (axum::http::StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    split_response(response).await
}

async fn split_response(response: Response<Body>) -> (axum::http::StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response should be valid JSON")
    };
    (status, json)
}

/// Count validation history rows for one license key.
pub fn count_validation_events(audit: &rusqlite::Connection, license_key: &str) -> i64 {
    audit
        .query_row(
            "SELECT COUNT(*) FROM validation_history WHERE license_key = ?1",
            [license_key],
            |row| row.get(0),
        )
        .unwrap()
}

/// Count lifecycle history rows for one entity.
pub fn count_history_entries(audit: &rusqlite::Connection, entity_id: &str) -> i64 {
    audit
        .query_row(
            "SELECT COUNT(*) FROM lifecycle_history WHERE entity_id = ?1",
            [entity_id],
            |row| row.get(0),
        )
        .unwrap()
}
