//! The transaction ledger: creation, step validation, and the append-only
//! step log.
//!
//! A protocol step is split in two so the work it guards happens in
//! between:
//!
//! 1. [`TransactionLedger::begin`] reads the transaction and its last step,
//!    validates the state-machine edge and claims `last.step + 1`. Of two
//!    concurrent requests only one gets the claim; the other fails with
//!    `TRANSACTION_INVALID` before doing any work.
//! 2. [`TransactionLedger::finish`] appends the step if the work succeeded,
//!    or releases the claim so the step can be retried.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tas_core::{
    generate_nonce, NewSubTransaction, NewTransaction, SubTransaction, SubTransactionStatus,
    SubTransactionType, Transaction, TransactionStatus, TransactionType, TransactionUpdate,
};
use tas_store::{InsertResult, Store};

use crate::error::{ErrorCode, Result, TasError};
use crate::workflow::Workflow;

/// A validated and claimed step waiting to be recorded.
#[derive(Debug, Clone)]
pub struct PendingStep {
    pub transaction: Transaction,
    pub last: SubTransaction,
    pub step_type: SubTransactionType,
}

impl PendingStep {
    /// The step number this step will occupy.
    pub fn step(&self) -> u32 {
        self.last.step + 1
    }
}

/// Transaction state machine over a [`Store`].
pub struct TransactionLedger<S: Store> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: Store> TransactionLedger<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a pending transaction with a fresh tx id and auth nonce.
    pub async fn create(&self, tx_type: TransactionType) -> Result<Transaction> {
        let new = NewTransaction {
            tx_id: Uuid::new_v4(),
            tx_type,
            expired_at: Utc::now() + self.ttl,
            auth_nonce: generate_nonce(),
            external_tx_id: None,
            external_did: None,
        };
        let transaction = self.store.insert_transaction(&new).await?;
        info!(tx_id = %transaction.tx_id, %tx_type, "transaction created");
        Ok(transaction)
    }

    /// Find a transaction by its external id.
    pub async fn find(&self, tx_id: &Uuid) -> Result<Transaction> {
        self.store
            .get_transaction_by_tx_id(tx_id)
            .await?
            .ok_or_else(|| {
                TasError::new(ErrorCode::TransactionNotFound, format!("transaction {tx_id}"))
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Steps
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a step after whatever is recorded now.
    pub async fn append_step(
        &self,
        transaction_id: i64,
        step_type: SubTransactionType,
        status: SubTransactionStatus,
    ) -> Result<SubTransaction> {
        let next = self
            .store
            .last_sub_transaction(transaction_id)
            .await?
            .map(|s| s.step + 1)
            .unwrap_or(1);
        self.insert_step(transaction_id, next, step_type, status)
            .await
    }

    /// The most recent step of a transaction.
    pub async fn last_step(&self, transaction_id: i64) -> Result<SubTransaction> {
        self.store
            .last_sub_transaction(transaction_id)
            .await?
            .ok_or_else(|| {
                TasError::new(
                    ErrorCode::SubTransactionNotFound,
                    format!("no steps for transaction {transaction_id}"),
                )
            })
    }

    pub async fn steps(&self, transaction_id: i64) -> Result<Vec<SubTransaction>> {
        Ok(self.store.list_sub_transactions(transaction_id).await?)
    }

    /// Check the state-machine edge into a new step.
    pub fn validate(
        &self,
        transaction: &Transaction,
        last: &SubTransaction,
        expected_predecessor: SubTransactionType,
    ) -> Result<()> {
        validate_at(transaction, last, expected_predecessor, Utc::now())
    }

    /// Validate `step_type` against the workflow and claim its step number.
    pub async fn begin(&self, tx_id: &Uuid, step_type: SubTransactionType) -> Result<PendingStep> {
        let transaction = self.find(tx_id).await?;
        let expected = Workflow::of(transaction.tx_type)
            .predecessor(step_type)
            .ok_or_else(|| {
                TasError::new(
                    ErrorCode::TransactionInvalid,
                    format!("{step_type} is not a step of {}", transaction.tx_type),
                )
            })?;

        let last = self.last_step(transaction.id).await?;
        self.validate(&transaction, &last, expected)?;

        let step = last.step + 1;
        if !self.store.claim_step(transaction.id, step).await? {
            return Err(TasError::new(
                ErrorCode::TransactionInvalid,
                format!("step {step} of transaction {tx_id} is already being processed"),
            ));
        }

        Ok(PendingStep {
            transaction,
            last,
            step_type,
        })
    }

    /// Record a step validated by [`begin`](Self::begin).
    pub async fn commit(&self, pending: &PendingStep) -> Result<SubTransaction> {
        self.insert_step(
            pending.transaction.id,
            pending.step(),
            pending.step_type,
            SubTransactionStatus::Success,
        )
        .await
    }

    /// Give up a claimed step without recording it.
    pub async fn abort(&self, pending: &PendingStep) -> Result<()> {
        self.store
            .release_step(pending.transaction.id, pending.step())
            .await?;
        debug!(transaction_id = pending.transaction.id, step = pending.step(), "step released");
        Ok(())
    }

    /// Commit on success, release the claim on failure.
    ///
    /// The work's own error is returned even if the release fails.
    pub async fn finish<T>(&self, pending: &PendingStep, outcome: Result<T>) -> Result<T> {
        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                self.release_quietly(pending).await;
                return Err(e);
            }
        };
        self.commit_or_release(pending).await?;
        Ok(value)
    }

    async fn commit_or_release(&self, pending: &PendingStep) -> Result<SubTransaction> {
        match self.commit(pending).await {
            Ok(sub) => Ok(sub),
            Err(e) => {
                self.release_quietly(pending).await;
                Err(e)
            }
        }
    }

    async fn release_quietly(&self, pending: &PendingStep) {
        if let Err(e) = self.abort(pending).await {
            warn!(
                tx_id = %pending.transaction.tx_id,
                step = pending.step(),
                error = %e,
                "failed to release step"
            );
        }
    }

    /// Validate and record a step with no work in between.
    pub async fn advance(&self, tx_id: &Uuid, step_type: SubTransactionType) -> Result<SubTransaction> {
        let pending = self.begin(tx_id, step_type).await?;
        self.commit_or_release(&pending).await
    }

    async fn insert_step(
        &self,
        transaction_id: i64,
        step: u32,
        sub_type: SubTransactionType,
        status: SubTransactionStatus,
    ) -> Result<SubTransaction> {
        let new = NewSubTransaction {
            transaction_id,
            step,
            sub_type,
            status,
        };
        match self.store.insert_sub_transaction(&new).await? {
            InsertResult::Inserted(sub) => {
                debug!(transaction_id, step, %sub_type, "step recorded");
                Ok(sub)
            }
            InsertResult::Conflict { existing } => Err(TasError::new(
                ErrorCode::TransactionInvalid,
                format!(
                    "step {step} of transaction {transaction_id} already recorded as {}",
                    existing.sub_type
                ),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Write the set fields of `update` and refresh `tx` from the stored row.
    ///
    /// Fields left `None` keep whatever is stored, including values written
    /// by other requests since `tx` was read.
    pub async fn update(&self, tx: &mut Transaction, update: TransactionUpdate) -> Result<()> {
        *tx = self.store.update_transaction(tx.id, &update).await?;
        Ok(())
    }

    pub async fn update_status(&self, tx: &mut Transaction, status: TransactionStatus) -> Result<()> {
        self.update(
            tx,
            TransactionUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_certificate_id(&self, tx: &mut Transaction, certificate_id: &str) -> Result<()> {
        self.update(
            tx,
            TransactionUpdate {
                certificate_id: Some(certificate_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_auth_nonce(&self, tx: &mut Transaction, auth_nonce: &str) -> Result<()> {
        self.update(
            tx,
            TransactionUpdate {
                auth_nonce: Some(auth_nonce.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_pii(&self, tx: &mut Transaction, pii: Vec<u8>) -> Result<()> {
        self.update(
            tx,
            TransactionUpdate {
                pii: Some(pii),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_did(&self, tx: &mut Transaction, did: &str) -> Result<()> {
        self.update(
            tx,
            TransactionUpdate {
                did: Some(did.to_string()),
                ..Default::default()
            },
        )
        .await
    }
}

/// [`TransactionLedger::validate`] at an explicit time.
///
/// Fails `TRANSACTION_INVALID` unless the transaction is pending, `TRANSACTION_EXPIRED`
/// once `now` is past its deadline, and `TRANSACTION_INVALID` unless the last
/// step is a successful `expected_predecessor`.
pub fn validate_at(
    transaction: &Transaction,
    last: &SubTransaction,
    expected_predecessor: SubTransactionType,
    now: DateTime<Utc>,
) -> Result<()> {
    if transaction.status != TransactionStatus::Pending {
        return Err(TasError::new(
            ErrorCode::TransactionInvalid,
            format!("transaction {} is {}", transaction.tx_id, transaction.status),
        ));
    }
    if transaction.is_expired_at(now) {
        return Err(TasError::new(
            ErrorCode::TransactionExpired,
            format!("transaction {} expired at {}", transaction.tx_id, transaction.expired_at),
        ));
    }
    if last.sub_type != expected_predecessor || last.status != SubTransactionStatus::Success {
        return Err(TasError::new(
            ErrorCode::TransactionInvalid,
            format!(
                "expected last step {expected_predecessor}, found {} ({})",
                last.sub_type, last.status
            ),
        ));
    }
    Ok(())
}
