use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::engine::{self, ValidationRequest};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::keys;
use crate::models::License;
use crate::releases::{self, ASSET_NOT_FOUND};

#[derive(Debug, Deserialize)]
pub struct ValidatePayload {
    pub license_key: String,
    pub machine_code: String,
    #[serde(default)]
    pub installed_version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Download URL for the release matching the installed version, or the
    /// latest release. Only present on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_data: Option<License>,
}

/// Run the validation chain and enrich an acceptance with the resolved
/// download asset. Catalog failures degrade to the sentinel; they never turn
/// a valid license into a rejection.
pub async fn validate_license(
    State(state): State<AppState>,
    Json(req): Json<ValidatePayload>,
) -> Result<Json<ValidateResponse>> {
    if req.license_key.trim().is_empty() {
        return Err(AppError::BadRequest(msg::LICENSE_KEY_REQUIRED.into()));
    }
    if req.machine_code.trim().is_empty() {
        return Err(AppError::BadRequest(msg::MACHINE_CODE_REQUIRED.into()));
    }

    let conn = state.db.get()?;
    let audit = state.audit.get()?;

    let request = ValidationRequest {
        license_key: req.license_key.trim().to_string(),
        machine_code: req.machine_code.trim().to_string(),
        installed_version: req.installed_version.clone(),
    };

    let outcome = engine::validate(&conn, &audit, &state.secret, &request)?;

    if !outcome.valid {
        return Ok(Json(ValidateResponse {
            valid: false,
            message: outcome.message,
            asset: None,
            license_data: None,
        }));
    }

    let asset = match state.catalog.releases().await {
        Ok(feed) => releases::resolve_asset(&feed, request.installed_version.as_deref()),
        Err(e) => {
            tracing::warn!("Catalog unavailable during validation: {}", e);
            ASSET_NOT_FOUND.to_string()
        }
    };

    Ok(Json(ValidateResponse {
        valid: true,
        message: None,
        asset: Some(asset),
        license_data: outcome.license,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPayload {
    pub license_key: String,
    pub email: String,
    pub machine_code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Pure key verification against a claimed identity. Touches no storage and
/// writes no history; useful for client-side sanity checks before install.
pub async fn verify_license(
    State(state): State<AppState>,
    Json(req): Json<VerifyPayload>,
) -> Result<Json<VerifyResponse>> {
    let verification = keys::verify_key(
        &state.secret,
        req.license_key.trim(),
        req.email.trim(),
        req.machine_code.trim(),
    );

    Ok(Json(VerifyResponse {
        valid: verification.valid,
        reason: verification.reason.map(|r| r.as_str()),
    }))
}
