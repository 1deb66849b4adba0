use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::keys;
use crate::models::{EntityKind, License, NewHistoryEntry, RegisterLicense};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub email: String,
    pub machine_code: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub license_key: String,
}

/// Issue a license key for an (email, machine code) pair. Pure issuance: no
/// record is created, the key itself carries the signature.
pub async fn generate_license(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let email = req.email.trim();
    let machine_code = req.machine_code.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_REQUIRED.into()));
    }
    if machine_code.is_empty() {
        return Err(AppError::BadRequest(msg::MACHINE_CODE_REQUIRED.into()));
    }

    let license_key = keys::generate_key(&state.secret, email, machine_code);

    Ok(Json(GenerateResponse { license_key }))
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub license: License,
}

/// Issue a key and persist an active license pre-bound to the machine.
///
/// Requires an existing client for the email. Refuses when a non-revoked
/// license already exists for the exact (email, machine_code) pair.
pub async fn register_license(
    State(state): State<AppState>,
    Json(req): Json<RegisterLicense>,
) -> Result<Json<RegisterResponse>> {
    let email = req.email.trim();
    let machine_code = req.machine_code.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_REQUIRED.into()));
    }
    if machine_code.is_empty() {
        return Err(AppError::BadRequest(msg::MACHINE_CODE_REQUIRED.into()));
    }

    let conn = state.db.get()?;
    let audit = state.audit.get()?;

    if queries::get_client_by_email(&conn, email)?.is_none() {
        return Err(AppError::NotFound(msg::NO_CLIENT_FOR_EMAIL.into()));
    }

    if queries::has_live_license_for_machine(&conn, email, machine_code)? {
        return Err(AppError::BadRequest(msg::LICENSE_EXISTS.into()));
    }

    let license_key = keys::generate_key(&state.secret, email, machine_code);
    let license = queries::create_license(
        &conn,
        &license_key,
        email,
        Some(machine_code),
        req.version.as_deref(),
    )?;

    queries::append_history_entry(
        &audit,
        &NewHistoryEntry {
            entity_type: EntityKind::License,
            entity_id: &license.id,
            action: "license_created",
            description: format!("License registered for {}", email),
            old_value: None,
            new_value: Some(license.status.as_ref()),
            notes: None,
            created_by: None,
        },
    )?;

    tracing::info!(license_id = %license.id, "License registered");

    Ok(Json(RegisterResponse {
        message: "License registered successfully".to_string(),
        license,
    }))
}
