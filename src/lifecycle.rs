//! Client and license lifecycle transitions.
//!
//! Every mutation writes exactly one lifecycle history entry describing
//! old value -> new value, except client deactivation which cascades and
//! writes one entry per affected license plus one for the client itself.
//! Revocation is a one-way gate: toggling refuses on a revoked record, and
//! only the revoke flow populates the revoked sub-record.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{msg, AppError, OptionExt, Result};
use crate::models::{
    Client, ClientStatus, EntityKind, License, LicenseRef, LicenseStatus, NewHistoryEntry,
};

/// Result of a lifecycle mutation: the updated entity and a human-readable
/// message describing the action taken.
#[derive(Debug, Clone)]
pub struct Transition<T> {
    pub entity: T,
    pub message: String,
}

fn client_action_word(status: ClientStatus) -> &'static str {
    match status {
        ClientStatus::Active => "activated",
        ClientStatus::Deactivated => "deactivated",
    }
}

fn license_action_word(status: LicenseStatus) -> &'static str {
    match status {
        LicenseStatus::Active => "activated",
        LicenseStatus::Inactive => "deactivated",
        LicenseStatus::Revoked => "revoked",
    }
}

/// Set or toggle a client's status. Deactivation cascades `inactive` onto
/// every non-revoked license sharing the client's email, each cascade
/// audited per affected license.
pub fn set_client_status(
    conn: &Connection,
    audit: &Connection,
    client_id: &str,
    status: Option<ClientStatus>,
    notes: Option<&str>,
    actor: Option<&str>,
) -> Result<Transition<Client>> {
    let client = queries::get_client_by_id(conn, client_id)?.or_not_found(msg::CLIENT_NOT_FOUND)?;

    let old_status = client.status;
    let new_status = status.unwrap_or_else(|| old_status.toggled());

    queries::update_client_status(conn, &client.id, new_status)?;

    queries::append_history_entry(
        audit,
        &NewHistoryEntry {
            entity_type: EntityKind::Client,
            entity_id: &client.id,
            action: "status_changed",
            description: format!(
                "Client status changed from {} to {}",
                old_status.as_ref(),
                new_status.as_ref()
            ),
            old_value: Some(old_status.as_ref()),
            new_value: Some(new_status.as_ref()),
            notes,
            created_by: actor,
        },
    )?;

    let mut cascaded = 0usize;
    if new_status == ClientStatus::Deactivated {
        cascaded = cascade_deactivate_licenses(conn, audit, &client.email, actor)?;
    }

    let updated = queries::get_client_by_id(conn, &client.id)?
        .or_not_found(msg::CLIENT_NOT_FOUND)?;

    let message = if new_status == ClientStatus::Deactivated {
        format!(
            "Client deactivated successfully. {} license(s) deactivated.",
            cascaded
        )
    } else {
        format!("Client {} successfully", client_action_word(new_status))
    };

    Ok(Transition {
        entity: updated,
        message,
    })
}

/// Force every non-revoked license for `email` to `inactive`, one history
/// entry per license touched. Revoked licenses are already non-active and
/// keep their revocation record.
fn cascade_deactivate_licenses(
    conn: &Connection,
    audit: &Connection,
    email: &str,
    actor: Option<&str>,
) -> Result<usize> {
    let licenses = queries::list_licenses_by_email(conn, email)?;
    let mut count = 0usize;

    for license in &licenses {
        if license.status == LicenseStatus::Revoked {
            continue;
        }
        queries::update_license_status(conn, &license.id, LicenseStatus::Inactive)?;
        let notes = format!(
            "Automatically deactivated when client {} was deactivated",
            email
        );
        queries::append_history_entry(
            audit,
            &NewHistoryEntry {
                entity_type: EntityKind::License,
                entity_id: &license.id,
                action: "status_changed",
                description: "License deactivated due to client deactivation".to_string(),
                old_value: Some(license.status.as_ref()),
                new_value: Some(LicenseStatus::Inactive.as_ref()),
                notes: Some(&notes),
                created_by: actor,
            },
        )?;
        count += 1;
    }

    Ok(count)
}

/// Set or toggle a license between `active` and `inactive`. Refuses on a
/// revoked record; an explicit `revoked` target is rejected since revocation
/// has its own flow.
pub fn set_license_status(
    conn: &Connection,
    audit: &Connection,
    license_ref: &LicenseRef,
    status: Option<LicenseStatus>,
    notes: Option<&str>,
    actor: Option<&str>,
) -> Result<Transition<License>> {
    let license =
        queries::get_license_by_ref(conn, license_ref)?.or_not_found(msg::LICENSE_NOT_FOUND)?;

    let old_status = license.status;
    let new_status = match status {
        Some(target) => old_status.checked_set(target)?,
        None => old_status.toggled()?,
    };

    queries::update_license_status(conn, &license.id, new_status)?;

    queries::append_history_entry(
        audit,
        &NewHistoryEntry {
            entity_type: EntityKind::License,
            entity_id: &license.id,
            action: "status_changed",
            description: format!(
                "License status changed from {} to {}",
                old_status.as_ref(),
                new_status.as_ref()
            ),
            old_value: Some(old_status.as_ref()),
            new_value: Some(new_status.as_ref()),
            notes,
            created_by: actor,
        },
    )?;

    let updated =
        queries::get_license_by_id(conn, &license.id)?.or_not_found(msg::LICENSE_NOT_FOUND)?;

    Ok(Transition {
        message: format!("License {} successfully", license_action_word(new_status)),
        entity: updated,
    })
}

/// Revoke a license. The only path that populates the revoked sub-record;
/// refuses with a conflict and performs no write when already revoked.
pub fn revoke(
    conn: &Connection,
    audit: &Connection,
    license_key: &str,
    reason: Option<&str>,
    actor: Option<&str>,
) -> Result<Transition<License>> {
    let license =
        queries::get_license_by_key(conn, license_key)?.or_not_found(msg::LICENSE_NOT_FOUND)?;

    if license.status == LicenseStatus::Revoked {
        return Err(AppError::Conflict(msg::ALREADY_REVOKED.into()));
    }

    let revoked_by = actor.unwrap_or("system");
    queries::revoke_license(conn, &license.id, reason, revoked_by)?;

    queries::append_history_entry(
        audit,
        &NewHistoryEntry {
            entity_type: EntityKind::License,
            entity_id: &license.id,
            action: "license_revoked",
            description: format!(
                "License status changed from {} to revoked",
                license.status.as_ref()
            ),
            old_value: Some(license.status.as_ref()),
            new_value: Some(LicenseStatus::Revoked.as_ref()),
            notes: reason,
            created_by: actor,
        },
    )?;

    let updated =
        queries::get_license_by_id(conn, &license.id)?.or_not_found(msg::LICENSE_NOT_FOUND)?;

    Ok(Transition {
        entity: updated,
        message: "License revoked successfully".to_string(),
    })
}
