use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Convert `Option<T>` into `Result<T>` with a NotFound error.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.to_string()))
    }
}

/// User-facing message constants shared between the engine, lifecycle
/// manager, and handlers. Validation rejection messages are part of the
/// external contract; keep the exact wording stable.
pub mod msg {
    pub const LICENSE_NOT_FOUND: &str = "License not found";
    pub const CLIENT_NOT_FOUND: &str = "Client not found";
    pub const NO_CLIENT_FOR_EMAIL: &str = "No client is registered with this email";
    pub const BOUND_DIFFERENT_MACHINE: &str = "License is bound to a different machine";
    pub const ALREADY_REVOKED: &str = "License is already revoked";
    pub const REVOKED_NO_TOGGLE: &str = "Cannot change status of a revoked license";
    pub const REVOKE_VIA_DEDICATED_ROUTE: &str =
        "Revocation is not a toggle target; use the revoke operation";
    pub const LICENSE_EXISTS: &str =
        "A license for this email and machine code already exists";
    pub const CLIENT_EXISTS: &str = "A client with this email already exists";
    pub const EMAIL_REQUIRED: &str = "Email is required";
    pub const MACHINE_CODE_REQUIRED: &str = "Machine code is required";
    pub const LICENSE_KEY_REQUIRED: &str = "License key is required";
    pub const LICENSE_REF_REQUIRED: &str = "License ID or license key is required";
    pub const CATALOG_UNAVAILABLE: &str = "Failed to fetch releases from the catalog";
}
