use serde::{Deserialize, Serialize};

/// Immutable record of one validation attempt, success or failure. Written
/// even when the license record does not exist (email is empty in that one
/// case).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationEvent {
    pub id: String,
    pub license_key: String,
    pub email: String,
    pub machine_code: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
    pub created_at: i64,
}

/// Fields for appending a validation event. The engine owns construction;
/// the audit store only inserts.
#[derive(Debug, Clone)]
pub struct NewValidationEvent<'a> {
    pub license_key: &'a str,
    pub email: &'a str,
    pub machine_code: &'a str,
    pub valid: bool,
    pub message: Option<&'a str>,
    pub installed_version: Option<&'a str>,
    pub license_id: Option<&'a str>,
}

/// Query parameters for the validation history listing. At least one of the
/// three filters must be present.
#[derive(Debug, Deserialize)]
pub struct ValidationHistoryQuery {
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub license_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub skip: Option<i64>,
}
