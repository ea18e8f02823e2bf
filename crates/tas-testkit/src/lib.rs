//! # TAS Testkit
//!
//! Testing utilities for the Trust Anchor Service.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: DID holders with self-signed documents, and a service
//!   wired to an in-memory registry
//! - **Generators**: Proptest strategies for property-based testing
//! - **Golden vectors**: Canonical JSON inputs with their expected bytes
//!   and digests, for cross-implementation checks
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use tas::core::{ServerTokenPurpose, TransactionType};
//! use tas_testkit::fixtures::{Identity, TestAnchor};
//!
//! async fn example() -> tas::Result<()> {
//!     let fixture = TestAnchor::new();
//!     let wallet = Identity::new("did:omn:wallet");
//!     fixture.enroll(&wallet);
//!
//!     let session = fixture
//!         .open_session(&wallet, TransactionType::UserRegistration, ServerTokenPurpose::CreateDid)
//!         .await?;
//!     println!("token {}", session.token.token_hash);
//!     Ok(())
//! }
//! ```
//!
//! ## Golden Vectors
//!
//! ```rust
//! use tas_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, digest) in verify_all_vectors() {
//!     assert!(ok, "{name}: {digest}");
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{Identity, Session, TestAnchor};
pub use generators::{server_token_seed, TokenParams};
pub use vectors::{all_vectors, verify_all_vectors, CanonicalVector};
