//! Registry-side record types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a registered DID document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DidDocStatus {
    Activated,
    Deactivated,
    Revoked,
    Terminated,
}

impl DidDocStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DidDocStatus::Activated => "ACTIVATED",
            DidDocStatus::Deactivated => "DEACTIVATED",
            DidDocStatus::Revoked => "REVOKED",
            DidDocStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for DidDocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an anchored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VcStatus {
    Active,
    Inactive,
    Revoked,
}

impl VcStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VcStatus::Active => "ACTIVE",
            VcStatus::Inactive => "INACTIVE",
            VcStatus::Revoked => "REVOKED",
        }
    }
}

impl fmt::Display for VcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role a DID holder plays in the trust framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    Tas,
    Wallet,
    Issuer,
    Verifier,
    WalletProvider,
    AppProvider,
    Etc,
}

impl RoleType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RoleType::Tas => "TAS",
            RoleType::Wallet => "WALLET",
            RoleType::Issuer => "ISSUER",
            RoleType::Verifier => "VERIFIER",
            RoleType::WalletProvider => "WALLET_PROVIDER",
            RoleType::AppProvider => "APP_PROVIDER",
            RoleType::Etc => "ETC",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry-tracked metadata of an issued credential.
///
/// The credential itself stays with the holder; only this record is
/// anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcMeta {
    pub id: String,
    /// Issuer DID.
    pub issuer: String,
    /// Holder DID.
    pub subject: String,
    pub credential_schema: String,
    pub status: VcStatus,
    pub issuance_date: String,
    pub valid_from: String,
    pub valid_until: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&DidDocStatus::Deactivated).unwrap(),
            "\"DEACTIVATED\""
        );
        assert_eq!(
            serde_json::to_string(&RoleType::WalletProvider).unwrap(),
            format!("\"{}\"", RoleType::WalletProvider)
        );
        let status: VcStatus = serde_json::from_str("\"REVOKED\"").unwrap();
        assert_eq!(status, VcStatus::Revoked);
    }

    #[test]
    fn test_vc_meta_shape() {
        let meta = VcMeta {
            id: "urn:uuid:1".into(),
            issuer: "did:omn:issuer".into(),
            subject: "did:omn:user".into(),
            credential_schema: "https://schema.example/mdl".into(),
            status: VcStatus::Active,
            issuance_date: "2024-01-01T00:00:00Z".into(),
            valid_from: "2024-01-01T00:00:00Z".into(),
            valid_until: "2025-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["credentialSchema"], "https://schema.example/mdl");
        assert_eq!(json["status"], "ACTIVE");
    }
}
