use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Client status. A license's authority is void whenever its client is not
/// active, regardless of the license's own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Deactivated,
}

impl ClientStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Deactivated,
            Self::Deactivated => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub status: ClientStatus,
    /// Latest version this client is entitled to; advisory.
    pub current_version: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_version: Option<String>,
}
