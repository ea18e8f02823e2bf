//! # TAS Store
//!
//! Storage abstraction for the Trust Anchor Service. Provides a trait-based
//! interface for transaction persistence with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of a write-once insert
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tas_store::{SqliteStore, Store};
//!
//! async fn example() -> tas_store::Result<()> {
//!     let store = SqliteStore::open("tas.db")?;
//!     let _tx = store.get_transaction(1).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Step claims**: a step is claimed before its work runs, so of two
//!   racing requests only one does the work and the other fails fast
//! - **Write-once records**: a second ECDH session or server token for the
//!   same transaction returns `Conflict`
//! - **No deletes**: transactions and their steps are kept forever; only
//!   the claim of a failed step is released

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
