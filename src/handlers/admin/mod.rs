mod clients;
mod history;
mod licenses;

pub use clients::*;
pub use history::*;
pub use licenses::*;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", post(create_client))
        .route("/clients/{client_id}/status", patch(update_client_status))
        .route("/licenses/status", patch(update_license_status))
        .route("/licenses/revoke", post(revoke_license))
        .route("/history", get(list_history))
        .route("/validation-history", get(list_validation_history))
}
