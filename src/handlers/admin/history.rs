use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{HistoryEntry, HistoryQuery, ValidationEvent, ValidationHistoryQuery};
use crate::pagination::{Paginated, PaginationQuery};

/// List lifecycle history for one entity, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Paginated<HistoryEntry>>> {
    let page = PaginationQuery {
        limit: query.limit,
        skip: query.skip,
    };

    let audit = state.audit.get()?;
    let (items, total) = queries::list_history_entries(
        &audit,
        query.entity_type,
        &query.entity_id,
        page.limit(),
        page.skip(),
    )?;

    Ok(Json(Paginated::new(items, total, page.limit(), page.skip())))
}

/// List validation attempts, newest first, filtered by license key, email,
/// and/or license ID. Unfiltered listing is refused; the table grows without
/// bound.
pub async fn list_validation_history(
    State(state): State<AppState>,
    Query(query): Query<ValidationHistoryQuery>,
) -> Result<Json<Paginated<ValidationEvent>>> {
    if query.license_key.is_none() && query.email.is_none() && query.license_id.is_none() {
        return Err(AppError::BadRequest(
            "At least one of license_key, email, or license_id is required".into(),
        ));
    }

    let page = PaginationQuery {
        limit: query.limit,
        skip: query.skip,
    };

    let audit = state.audit.get()?;
    let (items, total) = queries::list_validation_events(
        &audit,
        query.license_key.as_deref(),
        query.email.as_deref(),
        query.license_id.as_deref(),
        page.limit(),
        page.skip(),
    )?;

    Ok(Json(Paginated::new(items, total, page.limit(), page.skip())))
}
