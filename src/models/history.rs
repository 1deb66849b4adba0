use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Which kind of entity a lifecycle history entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Client,
    License,
}

/// Immutable record of one status transition. Owned by no entity; a pure
/// event log keyed by a denormalized `(entity_type, entity_id)` reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub entity_type: EntityKind,
    pub entity_id: String,
    /// e.g. "status_changed", "license_created", "license_revoked"
    pub action: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Actor name from the admin identity provider; absence is tolerated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: i64,
}

/// Fields for appending a lifecycle history entry.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry<'a> {
    pub entity_type: EntityKind,
    pub entity_id: &'a str,
    pub action: &'a str,
    pub description: String,
    pub old_value: Option<&'a str>,
    pub new_value: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub created_by: Option<&'a str>,
}

/// Query parameters for the lifecycle history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub entity_type: EntityKind,
    pub entity_id: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub skip: Option<i64>,
}
