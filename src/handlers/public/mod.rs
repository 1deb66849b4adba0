mod license;
mod validate;
mod version;

pub use license::*;
pub use validate::*;
pub use version::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::db::AppState;
use crate::rate_limit;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(limits: RateLimitConfig) -> Router<AppState> {
    // Key issuance gets the tightest tier; validation and catalog reads the
    // standard one.
    let strict = Router::new()
        .route("/license/generate", post(generate_license))
        .route("/license/register", post(register_license))
        .layer(rate_limit::strict_layer(limits.strict_rpm));

    let standard = Router::new()
        .route("/license/validate", post(validate_license))
        .route("/license/verify", post(verify_license))
        .route("/version/list", get(list_versions))
        .route("/version", get(version_asset))
        .route("/migration", get(migration_assets))
        .layer(rate_limit::standard_layer(limits.standard_rpm));

    let relaxed = Router::new()
        .route("/health", get(health))
        .layer(rate_limit::relaxed_layer(limits.relaxed_rpm));

    strict.merge(standard).merge(relaxed)
}
