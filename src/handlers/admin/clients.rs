use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::{Json, Path};
use crate::lifecycle;
use crate::models::{Client, ClientStatus, CreateClient};
use crate::util::extract_admin_actor;

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub message: String,
    pub client: Client,
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClient>,
) -> Result<Json<ClientResponse>> {
    if input.email.trim().is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_REQUIRED.into()));
    }

    let conn = state.db.get()?;
    let client = queries::create_client(
        &conn,
        &CreateClient {
            email: input.email.trim().to_string(),
            name: input.name.clone(),
            current_version: input.current_version.clone(),
        },
    )?;

    tracing::info!(client_id = %client.id, "Client created");

    Ok(Json(ClientResponse {
        message: "Client created successfully".to_string(),
        client,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClientStatusRequest {
    /// Target status; omitted means toggle.
    #[serde(default)]
    pub status: Option<ClientStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Set or toggle a client's status. Deactivation cascades onto the client's
/// non-revoked licenses; the response message reports how many were touched.
pub async fn update_client_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(client_id): Path<String>,
    Json(req): Json<ClientStatusRequest>,
) -> Result<Json<ClientResponse>> {
    let conn = state.db.get()?;
    let audit = state.audit.get()?;
    let actor = extract_admin_actor(&headers);

    let transition = lifecycle::set_client_status(
        &conn,
        &audit,
        &client_id,
        req.status,
        req.notes.as_deref(),
        actor.as_deref(),
    )?;

    Ok(Json(ClientResponse {
        message: transition.message,
        client: transition.entity,
    }))
}
