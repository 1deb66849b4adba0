use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::error::{msg, AppError, Result};

/// License status. A closed enum: `revoked` is a one-way gate reached only
/// through the dedicated revoke flow; activate/deactivate toggling refuses on
/// a revoked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Inactive,
    Revoked,
}

impl LicenseStatus {
    /// The status a plain toggle moves to. Errors on a revoked record.
    pub fn toggled(self) -> Result<Self> {
        match self {
            Self::Active => Ok(Self::Inactive),
            Self::Inactive => Ok(Self::Active),
            Self::Revoked => Err(AppError::Conflict(msg::REVOKED_NO_TOGGLE.into())),
        }
    }

    /// Check that an explicit transition to `target` is legal for the
    /// toggle/set path (revocation has its own flow).
    pub fn checked_set(self, target: Self) -> Result<Self> {
        if self == Self::Revoked {
            return Err(AppError::Conflict(msg::REVOKED_NO_TOGGLE.into()));
        }
        if target == Self::Revoked {
            return Err(AppError::BadRequest(msg::REVOKE_VIA_DEDICATED_ROUTE.into()));
        }
        Ok(target)
    }
}

/// Revocation sub-record, populated only by the revoke flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedInfo {
    pub reason: Option<String>,
    pub revoked_at: i64,
    pub revoked_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    /// The externally presented credential (nonce + truncated signature).
    pub license_key: String,
    /// Correlates to a Client record; not a foreign key.
    pub email: String,
    pub status: LicenseStatus,
    /// Machine fingerprint. Nullable; bound at most once (trust-on-first-use)
    /// or supplied at registration.
    pub machine_code: Option<String>,
    /// Last version reported by the validating client; advisory.
    pub installed_version: Option<String>,
    pub last_validated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked: Option<RevokedInfo>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Reference to a license by ID or by key, for lifecycle mutations.
#[derive(Debug, Clone)]
pub enum LicenseRef {
    Id(String),
    Key(String),
}

#[derive(Debug, Deserialize)]
pub struct RegisterLicense {
    pub email: String,
    pub machine_code: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flips_active_inactive() {
        assert_eq!(LicenseStatus::Active.toggled().unwrap(), LicenseStatus::Inactive);
        assert_eq!(LicenseStatus::Inactive.toggled().unwrap(), LicenseStatus::Active);
    }

    #[test]
    fn test_toggle_refuses_revoked() {
        assert!(LicenseStatus::Revoked.toggled().is_err());
        assert!(LicenseStatus::Revoked.checked_set(LicenseStatus::Active).is_err());
    }

    #[test]
    fn test_set_refuses_revoked_target() {
        assert!(LicenseStatus::Active.checked_set(LicenseStatus::Revoked).is_err());
        assert_eq!(
            LicenseStatus::Active.checked_set(LicenseStatus::Inactive).unwrap(),
            LicenseStatus::Inactive
        );
    }

    #[test]
    fn test_status_string_forms() {
        assert_eq!(LicenseStatus::Inactive.as_ref(), "inactive");
        assert_eq!("revoked".parse::<LicenseStatus>().unwrap(), LicenseStatus::Revoked);
    }
}
