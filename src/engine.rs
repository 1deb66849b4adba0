//! The ordered validation chain.
//!
//! Checks run strictly in order and the first failure short-circuits with a
//! specific user-facing message: existence, signature, client status, license
//! status, machine binding, then version bookkeeping. Every attempt that
//! reaches storage is recorded in validation history, success or failure;
//! that includes signature mismatches. Business-rule rejections are returned
//! as values, never as errors; only infrastructure faults propagate.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{msg, Result};
use crate::keys::{self, KeySecret};
use crate::models::{ClientStatus, License, LicenseStatus, NewValidationEvent};

/// A presented validation request.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub license_key: String,
    pub machine_code: String,
    pub installed_version: Option<String>,
}

/// Accept/reject decision plus the license record on acceptance.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub message: Option<String>,
    pub license: Option<License>,
}

impl ValidationOutcome {
    fn reject(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            license: None,
        }
    }

    fn accept(license: License) -> Self {
        Self {
            valid: true,
            message: None,
            license: Some(license),
        }
    }
}

/// Append a failure row to validation history.
fn audit_failure(
    audit: &Connection,
    req: &ValidationRequest,
    email: &str,
    license_id: Option<&str>,
    message: &str,
) -> Result<()> {
    queries::append_validation_event(
        audit,
        &NewValidationEvent {
            license_key: &req.license_key,
            email,
            machine_code: &req.machine_code,
            valid: false,
            message: Some(message),
            installed_version: req.installed_version.as_deref(),
            license_id,
        },
    )?;
    Ok(())
}

/// Run the validation chain for one presented key.
///
/// Side effects on acceptance: the one-time machine bind (atomic conditional
/// update), version bookkeeping, and a success history row. Rejections write
/// a failure history row. Asset resolution is enrichment layered on top by
/// the handler, not part of the decision.
pub fn validate(
    conn: &Connection,
    audit: &Connection,
    secret: &KeySecret,
    req: &ValidationRequest,
) -> Result<ValidationOutcome> {
    // 1. Load. A missing record is audited with an empty email, since the
    // claimed identity is unknown at this point.
    let Some(license) = queries::get_license_by_key(conn, &req.license_key)? else {
        audit_failure(audit, req, "", None, msg::LICENSE_NOT_FOUND)?;
        return Ok(ValidationOutcome::reject(msg::LICENSE_NOT_FOUND));
    };

    // 2. Authenticate against the stored email and the presented machine
    // code. Mismatches are audited like every other rejection path.
    let verification = keys::verify_key(secret, &req.license_key, &license.email, &req.machine_code);
    if !verification.valid {
        let reason = verification
            .reason
            .map(|r| r.as_str())
            .unwrap_or("invalid license key");
        audit_failure(audit, req, &license.email, Some(&license.id), reason)?;
        return Ok(ValidationOutcome::reject(reason));
    }

    // 3. Client gate: the license's authority is void without an active
    // client, regardless of the license's own status.
    let client = queries::get_client_by_email(conn, &license.email)?;
    let Some(client) = client else {
        audit_failure(audit, req, &license.email, Some(&license.id), msg::NO_CLIENT_FOR_EMAIL)?;
        return Ok(ValidationOutcome::reject(msg::NO_CLIENT_FOR_EMAIL));
    };
    if client.status != ClientStatus::Active {
        let message = format!("Client status is {}", client.status.as_ref());
        audit_failure(audit, req, &license.email, Some(&license.id), &message)?;
        return Ok(ValidationOutcome::reject(message));
    }

    // 4. License gate. Revoked rejects here; it does not fall through to the
    // machine-binding diagnostics.
    if license.status != LicenseStatus::Active {
        let message = format!("License is {}", license.status.as_ref());
        audit_failure(audit, req, &license.email, Some(&license.id), &message)?;
        return Ok(ValidationOutcome::reject(message));
    }

    // 5. Machine binding: trust-on-first-use, immutable once set.
    if let Some(ref bound) = license.machine_code {
        if bound != &req.machine_code {
            audit_failure(
                audit,
                req,
                &license.email,
                Some(&license.id),
                msg::BOUND_DIFFERENT_MACHINE,
            )?;
            return Ok(ValidationOutcome::reject(msg::BOUND_DIFFERENT_MACHINE));
        }
    } else {
        let bound_now = queries::bind_machine_code(conn, &license.id, &req.machine_code)?;
        if !bound_now {
            // Lost the race to a concurrent first validation. Re-read and
            // decide deterministically against whatever landed.
            let current = queries::get_license_by_id(conn, &license.id)?;
            let matches = current
                .as_ref()
                .and_then(|l| l.machine_code.as_deref())
                .map(|mc| mc == req.machine_code)
                .unwrap_or(false);
            if !matches {
                audit_failure(
                    audit,
                    req,
                    &license.email,
                    Some(&license.id),
                    msg::BOUND_DIFFERENT_MACHINE,
                )?;
                return Ok(ValidationOutcome::reject(msg::BOUND_DIFFERENT_MACHINE));
            }
        }
    }

    // 6. Version bookkeeping and validation stamp.
    queries::record_validation_success(conn, &license.id, req.installed_version.as_deref())?;

    // 7. Success history row with the final state.
    queries::append_validation_event(
        audit,
        &NewValidationEvent {
            license_key: &req.license_key,
            email: &license.email,
            machine_code: &req.machine_code,
            valid: true,
            message: None,
            installed_version: req.installed_version.as_deref(),
            license_id: Some(&license.id),
        },
    )?;

    let refreshed = queries::get_license_by_id(conn, &license.id)?.unwrap_or(license);
    Ok(ValidationOutcome::accept(refreshed))
}
