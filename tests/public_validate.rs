//! Tests for POST /license/validate.
//!
//! The validation chain is strictly ordered: existence, signature, client
//! status, license status, machine binding, version bookkeeping. Every
//! attempt that reaches storage leaves a validation history row.

use serde_json::json;

mod common;
use common::*;

/// A well-formed (40 hex chars) key that verifies for nothing.
const BOGUS_KEY: &str = "0000-0000-0000-0000-0000-0000-0000-0000-0000-0000";

#[tokio::test]
async fn test_validate_success_binds_machine() {
    let state = create_test_app_state();
    let key;
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        let (_, k) = create_test_license(&conn, "a@x.com", None);
        key = k;
    }

    let app = app(state.clone());
    let (status, json) = post_json(
        app,
        "/license/validate",
        json!({"license_key": key, "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert!(json.get("message").is_none());
    // No installed version presented: asset falls back to the latest release.
    assert_eq!(json["asset"], "https://dl.test/2.1.0.exe");
    assert_eq!(json["license_data"]["machine_code"], "MC-1");
    assert!(json["license_data"]["last_validated_at"].is_i64());

    let audit = state.audit.get().unwrap();
    assert_eq!(count_validation_events(&audit, &key), 1);
}

#[tokio::test]
async fn test_validate_same_machine_again_ok() {
    let state = create_test_app_state();
    let key;
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        let (_, k) = create_test_license(&conn, "a@x.com", None);
        key = k;
    }

    let app = app(state.clone());
    for _ in 0..2 {
        let (status, json) = post_json(
            app.clone(),
            "/license/validate",
            json!({"license_key": key, "machine_code": "MC-1"}),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK);
        assert_eq!(json["valid"], true);
    }

    let audit = state.audit.get().unwrap();
    assert_eq!(count_validation_events(&audit, &key), 2);
}

#[tokio::test]
async fn test_validate_rejects_different_bound_machine() {
    let state = create_test_app_state();
    let key;
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        // Key issued for MC-1, but the record is bound elsewhere.
        let k = keys::generate_key(&test_secret(), "a@x.com", "MC-1");
        queries::create_license(&conn, &k, "a@x.com", Some("MC-OTHER"), None).unwrap();
        key = k;
    }

    let app = app(state.clone());
    let (status, json) = post_json(
        app,
        "/license/validate",
        json!({"license_key": key, "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "License is bound to a different machine");
    assert!(json.get("asset").is_none());

    let audit = state.audit.get().unwrap();
    assert_eq!(count_validation_events(&audit, &key), 1);
}

#[tokio::test]
async fn test_validate_unknown_key_audited_with_empty_email() {
    let state = create_test_app_state();
    let key = keys::generate_key(&test_secret(), "nobody@x.com", "MC-1");

    let app = app(state.clone());
    let (status, json) = post_json(
        app,
        "/license/validate",
        json!({"license_key": key, "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "License not found");

    // The claimed identity is unknown; the audit row carries an empty email.
    let audit = state.audit.get().unwrap();
    let email: String = audit
        .query_row(
            "SELECT email FROM validation_history WHERE license_key = ?1",
            [key.as_str()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(email, "");
}

#[tokio::test]
async fn test_validate_signature_mismatch_is_audited() {
    let state = create_test_app_state();
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        // A stored key that verifies for no identity.
        queries::create_license(&conn, BOGUS_KEY, "a@x.com", None, None).unwrap();
    }

    let app = app(state.clone());
    let (status, json) = post_json(
        app,
        "/license/validate",
        json!({"license_key": BOGUS_KEY, "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "signature mismatch");

    let audit = state.audit.get().unwrap();
    let (email, valid): (String, i64) = audit
        .query_row(
            "SELECT email, valid FROM validation_history WHERE license_key = ?1",
            [BOGUS_KEY],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(email, "a@x.com");
    assert_eq!(valid, 0);
}

#[tokio::test]
async fn test_validate_rejects_missing_client() {
    let state = create_test_app_state();
    let key;
    {
        let conn = state.db.get().unwrap();
        let (_, k) = create_test_license(&conn, "orphan@x.com", None);
        key = k;
    }

    let (_, json) = post_json(
        app(state),
        "/license/validate",
        json!({"license_key": key, "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "No client is registered with this email");
}

#[tokio::test]
async fn test_validate_rejects_deactivated_client() {
    let state = create_test_app_state();
    let key;
    {
        let conn = state.db.get().unwrap();
        let client = create_test_client(&conn, "a@x.com");
        queries::update_client_status(&conn, &client.id, ClientStatus::Deactivated).unwrap();
        let (_, k) = create_test_license(&conn, "a@x.com", None);
        key = k;
    }

    let (_, json) = post_json(
        app(state),
        "/license/validate",
        json!({"license_key": key, "machine_code": "MC-1"}),
    )
    .await;

    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "Client status is deactivated");
}

#[tokio::test]
async fn test_validate_rejects_inactive_and_revoked_license() {
    let state = create_test_app_state();
    let (inactive_key, revoked_key);
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");

        let k1 = keys::generate_key(&test_secret(), "a@x.com", "MC-1");
        let inactive = queries::create_license(&conn, &k1, "a@x.com", None, None).unwrap();
        queries::update_license_status(&conn, &inactive.id, LicenseStatus::Inactive).unwrap();
        inactive_key = k1;

        let k2 = keys::generate_key(&test_secret(), "a@x.com", "MC-1");
        let revoked = queries::create_license(&conn, &k2, "a@x.com", None, None).unwrap();
        queries::revoke_license(&conn, &revoked.id, Some("piracy"), "admin").unwrap();
        revoked_key = k2;
    }

    let app = app(state);

    let (_, json) = post_json(
        app.clone(),
        "/license/validate",
        json!({"license_key": inactive_key, "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "License is inactive");

    // Revoked rejects at the license gate, before machine binding.
    let (_, json) = post_json(
        app,
        "/license/validate",
        json!({"license_key": revoked_key, "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "License is revoked");
}

#[tokio::test]
async fn test_validate_records_installed_version() {
    let state = create_test_app_state();
    let key;
    {
        let conn = state.db.get().unwrap();
        create_test_client(&conn, "a@x.com");
        let (_, k) = create_test_license(&conn, "a@x.com", None);
        key = k;
    }

    let (_, json) = post_json(
        app(state.clone()),
        "/license/validate",
        json!({"license_key": key, "machine_code": "MC-1", "installed_version": "2.0.0"}),
    )
    .await;

    assert_eq!(json["valid"], true);
    assert_eq!(json["license_data"]["installed_version"], "2.0.0");
    // Asset resolves to the release matching the installed version.
    assert_eq!(json["asset"], "https://dl.test/2.0.0.exe");
}

#[tokio::test]
async fn test_validate_missing_fields_rejected() {
    let state = create_test_app_state();
    let app = app(state);

    let (status, _) = post_json(
        app.clone(),
        "/license/validate",
        json!({"license_key": "", "machine_code": "MC-1"}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        app,
        "/license/validate",
        json!({"license_key": BOGUS_KEY, "machine_code": "  "}),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
}
