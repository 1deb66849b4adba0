//! Prefixed ID generation for Keygate entities.
//!
//! Format: `kg_{entity}_{uuid_simple}` (32 hex chars, no hyphens). The brand
//! prefix keeps Keygate IDs distinguishable from license keys and from any
//! identifiers the release catalog hands back.

use uuid::Uuid;

/// Entity types that have prefixed IDs.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Client,
    License,
    ValidationEvent,
    HistoryEntry,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Client => "kg_cli",
            Self::License => "kg_lic",
            Self::ValidationEvent => "kg_val",
            Self::HistoryEntry => "kg_hist",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
