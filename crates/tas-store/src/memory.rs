//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use tas_core::{
    EcdhRecord, NewSubTransaction, NewTransaction, ServerTokenRecord, SubTransaction, Transaction,
    TransactionUpdate,
};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Transactions indexed by row id.
    transactions: HashMap<i64, Transaction>,

    /// External id index: tx_id -> row id.
    tx_ids: HashMap<Uuid, i64>,

    /// Step log per transaction, ordered by step.
    steps: HashMap<i64, Vec<SubTransaction>>,

    /// Claimed `(transaction_id, step)` pairs.
    claims: HashSet<(i64, u32)>,

    /// One session per transaction.
    ecdh: HashMap<i64, EcdhRecord>,

    /// One token per transaction.
    tokens: HashMap<i64, ServerTokenRecord>,

    next_transaction_id: i64,
    next_sub_transaction_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let mut inner = self.write()?;

        if inner.tx_ids.contains_key(&new.tx_id) {
            return Err(StoreError::Duplicate(format!("tx_id {}", new.tx_id)));
        }

        inner.next_transaction_id += 1;
        let id = inner.next_transaction_id;
        let now = Utc::now();
        let transaction = Transaction {
            id,
            tx_id: new.tx_id,
            tx_type: new.tx_type,
            status: tas_core::TransactionStatus::Pending,
            expired_at: new.expired_at,
            auth_nonce: new.auth_nonce.clone(),
            did: None,
            external_tx_id: new.external_tx_id.clone(),
            external_did: new.external_did.clone(),
            certificate_id: None,
            pii: None,
            created_at: now,
            updated_at: now,
        };

        inner.tx_ids.insert(new.tx_id, id);
        inner.transactions.insert(id, transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let inner = self.read()?;
        Ok(inner.transactions.get(&id).cloned())
    }

    async fn get_transaction_by_tx_id(&self, tx_id: &Uuid) -> Result<Option<Transaction>> {
        let inner = self.read()?;
        Ok(inner
            .tx_ids
            .get(tx_id)
            .and_then(|id| inner.transactions.get(id))
            .cloned())
    }

    async fn update_transaction(&self, id: i64, update: &TransactionUpdate) -> Result<Transaction> {
        let mut inner = self.write()?;
        let stored = inner
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {}", id)))?;

        if let Some(status) = update.status {
            stored.status = status;
        }
        if let Some(auth_nonce) = &update.auth_nonce {
            stored.auth_nonce = auth_nonce.clone();
        }
        if let Some(did) = &update.did {
            stored.did = Some(did.clone());
        }
        if let Some(certificate_id) = &update.certificate_id {
            stored.certificate_id = Some(certificate_id.clone());
        }
        if let Some(pii) = &update.pii {
            stored.pii = Some(pii.clone());
        }
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn insert_sub_transaction(
        &self,
        new: &NewSubTransaction,
    ) -> Result<InsertResult<SubTransaction>> {
        let mut inner = self.write()?;

        if !inner.transactions.contains_key(&new.transaction_id) {
            return Err(StoreError::NotFound(format!(
                "transaction {}",
                new.transaction_id
            )));
        }

        let last_step = inner
            .steps
            .get(&new.transaction_id)
            .and_then(|steps| steps.last())
            .map(|s| s.step)
            .unwrap_or(0);

        if new.step <= last_step {
            let existing = inner
                .steps
                .get(&new.transaction_id)
                .and_then(|steps| steps.iter().find(|s| s.step == new.step))
                .cloned()
                .ok_or_else(|| StoreError::InvalidData(format!("step {} missing", new.step)))?;
            debug!(
                transaction_id = new.transaction_id,
                step = new.step,
                "step already taken"
            );
            return Ok(InsertResult::Conflict { existing });
        }
        if new.step != last_step + 1 {
            return Err(StoreError::InvalidData(format!(
                "step {} would leave a gap after {}",
                new.step, last_step
            )));
        }

        inner.next_sub_transaction_id += 1;
        let sub = SubTransaction {
            id: inner.next_sub_transaction_id,
            transaction_id: new.transaction_id,
            step: new.step,
            sub_type: new.sub_type,
            status: new.status,
            created_at: Utc::now(),
        };
        inner
            .steps
            .entry(new.transaction_id)
            .or_default()
            .push(sub.clone());

        Ok(InsertResult::Inserted(sub))
    }

    async fn claim_step(&self, transaction_id: i64, step: u32) -> Result<bool> {
        let mut inner = self.write()?;
        if !inner.transactions.contains_key(&transaction_id) {
            return Err(StoreError::NotFound(format!("transaction {}", transaction_id)));
        }

        let recorded = inner
            .steps
            .get(&transaction_id)
            .map(|steps| steps.iter().any(|s| s.step == step))
            .unwrap_or(false);
        if recorded || !inner.claims.insert((transaction_id, step)) {
            debug!(transaction_id, step, "step already claimed");
            return Ok(false);
        }
        Ok(true)
    }

    async fn release_step(&self, transaction_id: i64, step: u32) -> Result<()> {
        let mut inner = self.write()?;
        let recorded = inner
            .steps
            .get(&transaction_id)
            .map(|steps| steps.iter().any(|s| s.step == step))
            .unwrap_or(false);
        if !recorded {
            inner.claims.remove(&(transaction_id, step));
        }
        Ok(())
    }

    async fn last_sub_transaction(&self, transaction_id: i64) -> Result<Option<SubTransaction>> {
        let inner = self.read()?;
        Ok(inner
            .steps
            .get(&transaction_id)
            .and_then(|steps| steps.last())
            .cloned())
    }

    async fn list_sub_transactions(&self, transaction_id: i64) -> Result<Vec<SubTransaction>> {
        let inner = self.read()?;
        Ok(inner.steps.get(&transaction_id).cloned().unwrap_or_default())
    }

    async fn insert_ecdh(&self, record: &EcdhRecord) -> Result<InsertResult<EcdhRecord>> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.ecdh.get(&record.transaction_id) {
            return Ok(InsertResult::Conflict {
                existing: existing.clone(),
            });
        }
        inner.ecdh.insert(record.transaction_id, record.clone());
        Ok(InsertResult::Inserted(record.clone()))
    }

    async fn get_ecdh(&self, transaction_id: i64) -> Result<Option<EcdhRecord>> {
        let inner = self.read()?;
        Ok(inner.ecdh.get(&transaction_id).cloned())
    }

    async fn insert_server_token(
        &self,
        record: &ServerTokenRecord,
    ) -> Result<InsertResult<ServerTokenRecord>> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.tokens.get(&record.transaction_id) {
            return Ok(InsertResult::Conflict {
                existing: existing.clone(),
            });
        }
        inner.tokens.insert(record.transaction_id, record.clone());
        Ok(InsertResult::Inserted(record.clone()))
    }

    async fn find_server_token(
        &self,
        token_hash: &str,
        transaction_id: i64,
    ) -> Result<Option<ServerTokenRecord>> {
        let inner = self.read()?;
        Ok(inner
            .tokens
            .get(&transaction_id)
            .filter(|t| t.token_hash == token_hash)
            .cloned())
    }
}
