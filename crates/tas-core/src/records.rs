//! Persistent records: transactions, their step log, ECDH sessions, and
//! server tokens.
//!
//! Enum discriminants are stored and transmitted by their stable wire names
//! (`as_str`), never by position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when a stored or received name matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stable wire name.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// The workflow a transaction runs.
    TransactionType, "transaction type" {
        EntityRegistration => "ENTITY_REGISTRATION",
        UserRegistration => "USER_REGISTRATION",
        IssueVc => "ISSUE_VC",
        UserUpdate => "USER_UPDATE",
        DidDocRestore => "DIDDOC_RESTORE",
        RevokeVc => "REVOKE_VC",
    }
}

wire_enum! {
    TransactionStatus, "transaction status" {
        Pending => "PENDING",
        Completed => "COMPLETED",
    }
}

wire_enum! {
    /// The protocol step a sub-transaction records.
    SubTransactionType, "sub-transaction type" {
        Propose => "PROPOSE",
        RequestEcdh => "REQUEST_ECDH",
        RequestCreateToken => "REQUEST_CREATE_TOKEN",
        RequestRegisterDid => "REQUEST_REGISTER_DID",
        RequestUpdateDid => "REQUEST_UPDATE_DID",
        RequestRestoreDid => "REQUEST_RESTORE_DID",
        RequestIssueVc => "REQUEST_ISSUE_VC",
        RequestRevokeVc => "REQUEST_REVOKE_VC",
        Confirm => "CONFIRM",
    }
}

wire_enum! {
    SubTransactionStatus, "sub-transaction status" {
        Success => "SUCCESS",
        Error => "ERROR",
    }
}

wire_enum! {
    /// What a server token authorizes.
    ServerTokenPurpose, "server token purpose" {
        CreateDid => "CREATE_DID",
        CreateDidAndIssueVc => "CREATE_DID_AND_ISSUE_VC",
        IssueVc => "ISSUE_VC",
        UpdateDid => "UPDATE_DID",
        RestoreDid => "RESTORE_DID",
        RevokeVc => "REVOKE_VC",
    }
}

wire_enum! {
    /// Session cipher suites.
    SymmetricCipherType, "cipher type" {
        Aes128Cbc => "AES-128-CBC",
        Aes128Ecb => "AES-128-ECB",
        Aes256Cbc => "AES-256-CBC",
        Aes256Ecb => "AES-256-ECB",
    }
}

wire_enum! {
    SymmetricPaddingType, "padding type" {
        NoPad => "NOPAD",
        Pkcs5 => "PKCS5",
    }
}

impl SymmetricCipherType {
    /// Session key length in bytes.
    pub const fn key_len(&self) -> usize {
        match self {
            SymmetricCipherType::Aes128Cbc | SymmetricCipherType::Aes128Ecb => 16,
            SymmetricCipherType::Aes256Cbc | SymmetricCipherType::Aes256Ecb => 32,
        }
    }

    /// Whether the mode chains blocks through an IV.
    pub const fn uses_iv(&self) -> bool {
        matches!(
            self,
            SymmetricCipherType::Aes128Cbc | SymmetricCipherType::Aes256Cbc
        )
    }
}

/// A protocol instance. Never deleted; history lives in its sub-transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned row id.
    pub id: i64,
    /// Externally visible transaction id.
    pub tx_id: Uuid,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub expired_at: DateTime<Utc>,
    /// Multibase 16-byte nonce handed to the client at propose time.
    pub auth_nonce: String,
    /// Subject DID, once known.
    pub did: Option<String>,
    pub external_tx_id: Option<String>,
    pub external_did: Option<String>,
    pub certificate_id: Option<String>,
    pub pii: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether the transaction is past its deadline at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }
}

/// Fields supplied when creating a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub tx_id: Uuid,
    pub tx_type: TransactionType,
    pub expired_at: DateTime<Utc>,
    pub auth_nonce: String,
    pub external_tx_id: Option<String>,
    pub external_did: Option<String>,
}

/// A partial update of a transaction's mutable fields.
///
/// `None` leaves the stored value as it is, so concurrent writers touching
/// different fields never overwrite each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub auth_nonce: Option<String>,
    pub did: Option<String>,
    pub certificate_id: Option<String>,
    pub pii: Option<Vec<u8>>,
}

/// One completed protocol step. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTransaction {
    pub id: i64,
    pub transaction_id: i64,
    /// 1-based, gapless per transaction.
    pub step: u32,
    pub sub_type: SubTransactionType,
    pub status: SubTransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when appending a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubTransaction {
    pub transaction_id: i64,
    pub step: u32,
    pub sub_type: SubTransactionType,
    pub status: SubTransactionStatus,
}

/// The negotiated session of a transaction. Written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdhRecord {
    pub transaction_id: i64,
    pub client_did: String,
    /// Multibase session key.
    pub session_key: String,
    /// Multibase `SHA256(client_nonce || server_nonce)`. Informational only.
    pub merged_nonce: Option<String>,
    pub cipher: SymmetricCipherType,
    pub padding: SymmetricPaddingType,
    pub created_at: DateTime<Utc>,
}

/// A minted server token. Written once, checked by later steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTokenRecord {
    pub transaction_id: i64,
    pub purpose: ServerTokenPurpose,
    /// Multibase SHA-256 of the canonical signed token data.
    pub token_hash: String,
    pub app_id: String,
    pub wallet_id: String,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ServerTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expired_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for t in SubTransactionType::ALL {
            assert_eq!(t.as_str().parse::<SubTransactionType>().unwrap(), *t);
        }
        for c in SymmetricCipherType::ALL {
            assert_eq!(c.as_str().parse::<SymmetricCipherType>().unwrap(), *c);
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&ServerTokenPurpose::CreateDidAndIssueVc).unwrap();
        assert_eq!(json, "\"CREATE_DID_AND_ISSUE_VC\"");
        let cipher: SymmetricCipherType = serde_json::from_str("\"AES-256-CBC\"").unwrap();
        assert_eq!(cipher, SymmetricCipherType::Aes256Cbc);
    }

    #[test]
    fn test_unknown_name() {
        let err = "SOMETHING".parse::<TransactionType>().unwrap_err();
        assert_eq!(err.kind, "transaction type");
    }

    #[test]
    fn test_key_lengths() {
        assert_eq!(SymmetricCipherType::Aes128Ecb.key_len(), 16);
        assert_eq!(SymmetricCipherType::Aes256Cbc.key_len(), 32);
        assert!(!SymmetricCipherType::Aes256Ecb.uses_iv());
    }
}
