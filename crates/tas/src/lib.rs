//! # Trust Anchor Service
//!
//! Mediates DID-document lifecycle operations and credential anchoring
//! between clients and a DID registry.
//!
//! ## Overview
//!
//! Every interaction is a **transaction**: a typed, expiring protocol
//! instance whose progress is an append-only log of **steps**. Each
//! transaction type follows a fixed sequence:
//!
//! ```text
//! PROPOSE -> REQUEST_ECDH -> REQUEST_CREATE_TOKEN -> <action> -> CONFIRM
//! ```
//!
//! - **Key agreement**: the client and service derive a shared AES session
//!   key over ephemeral P-256 keys and exchanged nonces.
//! - **Server token**: a service-signed capability, bound to the
//!   transaction, a purpose, a wallet and an app, delivered encrypted
//!   under the session key. Later steps present its hash.
//! - **Action**: register, update or restore a DID, or anchor or revoke a
//!   VC, countersigned by the service's `#invoke` key where the registry
//!   needs it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tas::{TasConfig, TrustAnchor};
//! use tas::core::{KeyRing, TransactionType};
//! use tas::registry::{HttpRegistry, RegistryConfig};
//! use tas::store::SqliteStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TasConfig::default();
//!     let store = Arc::new(SqliteStore::open("tas.db")?);
//!     let registry = Arc::new(HttpRegistry::new(&config.registry)?);
//!     let signer = Arc::new(KeyRing::generate());
//!
//!     let anchor = TrustAnchor::new(config, store, registry, signer)?;
//!     let refresher = anchor.start_cache_refresh();
//!
//!     let proposal = anchor.propose(TransactionType::EntityRegistration).await?;
//!     // ... the client continues with request_ecdh, request_create_token ...
//!
//!     refresher.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `tas::core` - Identifiers, documents, proofs and records
//! - `tas::store` - Storage abstraction, memory and SQLite backends
//! - `tas::ecdh` - Key agreement and session ciphers
//! - `tas::registry` - Registry clients and the DID document cache

pub mod anchor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod token;
pub mod workflow;

// Re-export component crates
pub use tas_core as core;
pub use tas_ecdh as ecdh;
pub use tas_registry as registry;
pub use tas_store as store;

// Re-export main types for convenience
pub use anchor::{Proposal, TrustAnchor, USER_DOCUMENT_ROLE};
pub use config::{TasConfig, DEFAULT_TRANSACTION_TTL_SECS};
pub use error::{ErrorCode, Result, TasError};
pub use ledger::{validate_at, PendingStep, TransactionLedger};
pub use token::{
    ensure_binding, token_hash, MintedToken, OpenedToken, ServerTokenData,
    ServerTokenPresentation, ServerTokenSeed, ServerTokenService, TokenBearer,
};
pub use workflow::Workflow;
