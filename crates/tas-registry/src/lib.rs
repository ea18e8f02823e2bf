//! # TAS Registry
//!
//! Access to the external store of DID documents and VC metadata, and the
//! cache the service resolves documents through.
//!
//! ## Key Types
//!
//! - [`Registry`] - The async trait every backend implements
//! - [`MemoryRegistry`] - Versioned in-memory backend for tests
//! - [`HttpRegistry`] - JSON-over-HTTP client with a request timeout
//! - [`DidDocumentCache`] - Pull-through TTL cache with a background refresher
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tas_registry::{DidDocumentCache, HttpRegistry, RegistryConfig, DEFAULT_TTL};
//!
//! async fn example() -> tas_registry::Result<()> {
//!     let registry = Arc::new(HttpRegistry::new(&RegistryConfig::default())?);
//!     let cache = Arc::new(DidDocumentCache::new(registry, DEFAULT_TTL));
//!     let refresher = cache.start(DEFAULT_TTL);
//!     // ... serve requests ...
//!     refresher.stop().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;
pub mod types;

pub use cache::{CacheConfig, CacheRefresher, DidDocumentCache, DEFAULT_TTL, MIN_REFRESH_INTERVAL};
pub use error::{RegistryError, Result};
pub use http::{HttpRegistry, RegistryConfig};
pub use memory::MemoryRegistry;
pub use traits::Registry;
pub use types::{DidDocStatus, RoleType, VcMeta, VcStatus};
