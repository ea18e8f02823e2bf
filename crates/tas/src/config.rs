//! Service configuration.
//!
//! The host process fills this in (from a file, the environment, or code);
//! loading is not this crate's concern. Durations are in seconds.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use tas_core::Did;
use tas_ecdh::EcdhConfig;
use tas_registry::{CacheConfig, RegistryConfig};

use crate::error::{ErrorCode, Result, TasError};

/// Default transaction lifetime: 24 hours.
pub const DEFAULT_TRANSACTION_TTL_SECS: u64 = 24 * 60 * 60;

/// Configuration for the Trust Anchor Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasConfig {
    /// The service's own DID.
    pub tas_did: String,
    /// Reference to the service's certificate VC, embedded in every
    /// invocation envelope and server token.
    pub cert_vc_ref: String,
    pub transaction_ttl_secs: u64,
    pub server_token_ttl_secs: u64,
    pub ecdh: EcdhConfig,
    pub cache: CacheConfig,
    pub registry: RegistryConfig,
}

impl Default for TasConfig {
    fn default() -> Self {
        Self {
            tas_did: "did:omn:tas".into(),
            cert_vc_ref: String::new(),
            transaction_ttl_secs: DEFAULT_TRANSACTION_TTL_SECS,
            server_token_ttl_secs: DEFAULT_TRANSACTION_TTL_SECS,
            ecdh: EcdhConfig::default(),
            cache: CacheConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl TasConfig {
    /// Parse the configured DID.
    pub fn did(&self) -> Result<Did> {
        Did::parse(&self.tas_did)
            .map_err(|e| TasError::new(ErrorCode::InvalidDid, format!("tas_did: {e}")))
    }

    pub fn transaction_ttl(&self) -> Duration {
        seconds(self.transaction_ttl_secs)
    }

    pub fn server_token_ttl(&self) -> Duration {
        seconds(self.server_token_ttl_secs)
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}
