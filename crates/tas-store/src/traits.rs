//! Store trait: the abstract interface for transaction persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use tas_core::{
    EcdhRecord, NewSubTransaction, NewTransaction, ServerTokenRecord, SubTransaction, Transaction,
    TransactionUpdate,
};
use uuid::Uuid;

use crate::error::Result;

/// Result of a write-once insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult<T> {
    /// The row was new and is now stored.
    Inserted(T),
    /// A row already occupies the slot; nothing was written.
    Conflict {
        /// The row that won.
        existing: T,
    },
}

impl<T> InsertResult<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted(_))
    }
}

/// The Store trait: async interface for transaction persistence.
///
/// # Design Notes
///
/// - **Append-only steps**: `(transaction_id, step)` is unique. Inserting a
///   step that is already taken returns `Conflict`; inserting past the next
///   free step is an error.
/// - **Step claims**: a step number is claimed before its work runs and the
///   claim is write-once, so of two requests racing on the same step only
///   one ever does the work. A claim stays in place once its step is
///   recorded; only a claim whose step was never recorded can be released.
/// - **Write-once records**: at most one `EcdhRecord` and one
///   `ServerTokenRecord` per transaction; a second insert returns `Conflict`.
/// - **No deletes**: released claims are the only rows ever removed.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a transaction and return it with its assigned id.
    async fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction>;

    /// Get a transaction by row id.
    async fn get_transaction(&self, id: i64) -> Result<Option<Transaction>>;

    /// Get a transaction by its external transaction id.
    async fn get_transaction_by_tx_id(&self, tx_id: &Uuid) -> Result<Option<Transaction>>;

    /// Apply the set fields of `update` and return the stored row.
    ///
    /// Fails with `NotFound` if the row does not exist.
    async fn update_transaction(&self, id: i64, update: &TransactionUpdate) -> Result<Transaction>;

    // ─────────────────────────────────────────────────────────────────────────
    // Sub-transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a step.
    ///
    /// # Returns
    /// - `Inserted` if `new.step` was the next free step.
    /// - `Conflict` with the stored row if that step is already taken.
    async fn insert_sub_transaction(
        &self,
        new: &NewSubTransaction,
    ) -> Result<InsertResult<SubTransaction>>;

    /// Reserve `step` for the caller.
    ///
    /// Returns `false` if the step is already claimed or recorded.
    async fn claim_step(&self, transaction_id: i64, step: u32) -> Result<bool>;

    /// Drop the claim on a step that was never recorded, so it can be
    /// retried. Claims on recorded steps are kept.
    async fn release_step(&self, transaction_id: i64, step: u32) -> Result<()>;

    /// The highest step recorded for a transaction.
    async fn last_sub_transaction(&self, transaction_id: i64) -> Result<Option<SubTransaction>>;

    /// Every step of a transaction, ordered by step.
    async fn list_sub_transactions(&self, transaction_id: i64) -> Result<Vec<SubTransaction>>;

    // ─────────────────────────────────────────────────────────────────────────
    // ECDH sessions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_ecdh(&self, record: &EcdhRecord) -> Result<InsertResult<EcdhRecord>>;

    async fn get_ecdh(&self, transaction_id: i64) -> Result<Option<EcdhRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Server tokens
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_server_token(
        &self,
        record: &ServerTokenRecord,
    ) -> Result<InsertResult<ServerTokenRecord>>;

    /// Look up a token by its hash, scoped to one transaction.
    async fn find_server_token(
        &self,
        token_hash: &str,
        transaction_id: i64,
    ) -> Result<Option<ServerTokenRecord>>;
}
