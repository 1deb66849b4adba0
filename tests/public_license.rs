//! Tests for POST /license/generate, /license/register, and /license/verify.

use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn test_generate_returns_verifiable_key() {
    let state = create_test_app_state();
    let app = app(state);

    let (status, body) = post_json(
        app,
        "/license/generate",
        json!({"email": "a@x.com", "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    let key = body["license_key"].as_str().unwrap();

    // 40 hex chars in 10 dash-separated groups of 4.
    let groups: Vec<&str> = key.split('-').collect();
    assert_eq!(groups.len(), 10);
    assert!(groups.iter().all(|g| g.len() == 4));

    // The key verifies against the server secret for the same identity only.
    assert!(keys::verify_key(&test_secret(), key, "a@x.com", "MC-1").valid);
    assert!(!keys::verify_key(&test_secret(), key, "a@x.com", "MC-2").valid);
}

#[tokio::test]
async fn test_generate_requires_fields() {
    let state = create_test_app_state();
    let app = app(state);

    let (status, body) = post_json(
        app.clone(),
        "/license/generate",
        json!({"email": " ", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Email is required");

    let (status, body) = post_json(
        app,
        "/license/generate",
        json!({"email": "a@x.com", "machine_code": ""}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Machine code is required");
}

#[tokio::test]
async fn test_register_creates_bound_license_with_history() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
    }

    let (status, body) = post_json(
        app(state.clone()),
        "/license/register",
        json!({"email": "a@x.com", "machine_code": "MC-1", "version": "2.0.0"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["message"], "License registered successfully");
    assert_eq!(body["license"]["status"], "active");
    assert_eq!(body["license"]["machine_code"], "MC-1");
    assert_eq!(body["license"]["installed_version"], "2.0.0");

    let license_id = body["license"]["id"].as_str().unwrap();
    let audit = state.audit.get().unwrap();
    let action: String = audit
        .query_row(
            "SELECT action FROM lifecycle_history WHERE entity_id = ?1",
            [license_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(action, "license_created");
}

#[tokio::test]
async fn test_register_requires_existing_client() {
    let state = create_test_app_state();

    let (status, body) = post_json(
        app(state),
        "/license/register",
        json!({"email": "nobody@x.com", "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "No client is registered with this email");
}

#[tokio::test]
async fn test_register_refuses_duplicate_machine_pair() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        create_test_license(&conn, "a@x.com", Some("MC-1"));
    }

    let app = app(state.clone());
    let (status, _) = post_json(
        app.clone(),
        "/license/register",
        json!({"email": "a@x.com", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);

    // A different machine for the same client is fine.
    let (status, _) = post_json(
        app,
        "/license/register",
        json!({"email": "a@x.com", "machine_code": "MC-2"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
}

#[tokio::test]
async fn test_register_allowed_after_revocation() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        let (license, _) = create_test_license(&conn, "a@x.com", Some("MC-1"));
        queries::revoke_license(&conn, &license.id, None, "system").unwrap();
    }

    // Revoked licenses do not block a fresh registration for the pair.
    let (status, _) = post_json(
        app(state),
        "/license/register",
        json!({"email": "a@x.com", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
}

#[tokio::test]
async fn test_verify_is_pure() {
    let state = create_test_app_state();
    let key = keys::generate_key(&test_secret(), "a@x.com", "MC-1");

    let app = app(state.clone());
    let (status, body) = post_json(
        app.clone(),
        "/license/verify",
        json!({"license_key": key, "email": "a@x.com", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (_, body) = post_json(
        app.clone(),
        "/license/verify",
        json!({"license_key": key, "email": "b@x.com", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "signature mismatch");

    let (_, body) = post_json(
        app.clone(),
        "/license/verify",
        json!({"license_key": "ABCD", "email": "a@x.com", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(body["reason"], "invalid key length");

    // Non-hex keys, including multibyte characters at the nonce boundary,
    // are malformed rather than a server error.
    let odd_key = format!("{}é{}", "A".repeat(15), "B".repeat(30));
    let (status, body) = post_json(
        app,
        "/license/verify",
        json!({"license_key": odd_key, "email": "a@x.com", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "invalid key length");

    // Pure verification writes no history.
    let audit = state.audit.get().unwrap();
    assert_eq!(count_validation_events(&audit, &key), 0);
}
