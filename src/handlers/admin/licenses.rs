use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::lifecycle;
use crate::models::{License, LicenseRef, LicenseStatus};
use crate::util::extract_admin_actor;

#[derive(Debug, Serialize)]
pub struct LicenseResponse {
    pub message: String,
    pub license: License,
}

#[derive(Debug, Deserialize)]
pub struct LicenseStatusRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub license_key: Option<String>,
    /// Target status; omitted means toggle. `revoked` is not a valid target
    /// here, revocation has its own route.
    #[serde(default)]
    pub status: Option<LicenseStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Set or toggle a license between active and inactive, addressed by ID or
/// by key. Refuses on a revoked record.
pub async fn update_license_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LicenseStatusRequest>,
) -> Result<Json<LicenseResponse>> {
    let license_ref = match (req.id, req.license_key) {
        (Some(id), _) => LicenseRef::Id(id),
        (None, Some(key)) => LicenseRef::Key(key),
        (None, None) => return Err(AppError::BadRequest(msg::LICENSE_REF_REQUIRED.into())),
    };

    let conn = state.db.get()?;
    let audit = state.audit.get()?;
    let actor = extract_admin_actor(&headers);

    let transition = lifecycle::set_license_status(
        &conn,
        &audit,
        &license_ref,
        req.status,
        req.notes.as_deref(),
        actor.as_deref(),
    )?;

    Ok(Json(LicenseResponse {
        message: transition.message,
        license: transition.entity,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub license_key: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Revoke a license permanently. Conflict with no write when it is already
/// revoked.
pub async fn revoke_license(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<LicenseResponse>> {
    if req.license_key.trim().is_empty() {
        return Err(AppError::BadRequest(msg::LICENSE_KEY_REQUIRED.into()));
    }

    let conn = state.db.get()?;
    let audit = state.audit.get()?;
    let actor = extract_admin_actor(&headers);

    let transition = lifecycle::revoke(
        &conn,
        &audit,
        req.license_key.trim(),
        req.reason.as_deref(),
        actor.as_deref(),
    )?;

    tracing::info!(license_id = %transition.entity.id, "License revoked");

    Ok(Json(LicenseResponse {
        message: transition.message,
        license: transition.entity,
    }))
}
