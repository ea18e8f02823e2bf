//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use tas_core::{
    EcdhRecord, NewSubTransaction, NewTransaction, ServerTokenRecord, SubTransaction, Transaction,
    TransactionStatus, TransactionUpdate,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row conversion
// ─────────────────────────────────────────────────────────────────────────────

fn to_millis(t: &DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn millis_column(row: &Row<'_>, idx: &str) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, idx.to_string(), Type::Integer)
    })
}

fn enum_column<T>(row: &Row<'_>, idx: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: String = row.get(idx)?;
    s.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let tx_id: String = row.get("tx_id")?;
    Ok(Transaction {
        id: row.get("id")?,
        tx_id: Uuid::parse_str(&tx_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        tx_type: enum_column(row, "tx_type")?,
        status: enum_column(row, "status")?,
        expired_at: millis_column(row, "expired_at")?,
        auth_nonce: row.get("auth_nonce")?,
        did: row.get("did")?,
        external_tx_id: row.get("external_tx_id")?,
        external_did: row.get("external_did")?,
        certificate_id: row.get("certificate_id")?,
        pii: row.get("pii")?,
        created_at: millis_column(row, "created_at")?,
        updated_at: millis_column(row, "updated_at")?,
    })
}

fn row_to_sub_transaction(row: &Row<'_>) -> rusqlite::Result<SubTransaction> {
    Ok(SubTransaction {
        id: row.get("id")?,
        transaction_id: row.get("transaction_id")?,
        step: row.get("step")?,
        sub_type: enum_column(row, "sub_type")?,
        status: enum_column(row, "status")?,
        created_at: millis_column(row, "created_at")?,
    })
}

fn row_to_ecdh(row: &Row<'_>) -> rusqlite::Result<EcdhRecord> {
    Ok(EcdhRecord {
        transaction_id: row.get("transaction_id")?,
        client_did: row.get("client_did")?,
        session_key: row.get("session_key")?,
        merged_nonce: row.get("merged_nonce")?,
        cipher: enum_column(row, "cipher")?,
        padding: enum_column(row, "padding")?,
        created_at: millis_column(row, "created_at")?,
    })
}

fn row_to_server_token(row: &Row<'_>) -> rusqlite::Result<ServerTokenRecord> {
    Ok(ServerTokenRecord {
        transaction_id: row.get("transaction_id")?,
        purpose: enum_column(row, "purpose")?,
        token_hash: row.get("token_hash")?,
        app_id: row.get("app_id")?,
        wallet_id: row.get("wallet_id")?,
        expired_at: millis_column(row, "expired_at")?,
        created_at: millis_column(row, "created_at")?,
    })
}

const SELECT_TRANSACTION: &str = "SELECT id, tx_id, tx_type, status, expired_at, auth_nonce, did,
    external_tx_id, external_did, certificate_id, pii, created_at, updated_at FROM transactions";

const SELECT_SUB_TRANSACTION: &str =
    "SELECT id, transaction_id, step, sub_type, status, created_at FROM sub_transactions";

fn sub_transaction_at(
    conn: &Connection,
    transaction_id: i64,
    step: u32,
) -> rusqlite::Result<Option<SubTransaction>> {
    conn.query_row(
        &format!(
            "{} WHERE transaction_id = ?1 AND step = ?2",
            SELECT_SUB_TRANSACTION
        ),
        params![transaction_id, step],
        row_to_sub_transaction,
    )
    .optional()
}

#[async_trait]
impl Store for SqliteStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let new = new.clone();
        self.run(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT id FROM transactions WHERE tx_id = ?1",
                    params![new.tx_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StoreError::Duplicate(format!("tx_id {}", new.tx_id)));
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO transactions (tx_id, tx_type, status, expired_at, auth_nonce,
                    external_tx_id, external_did, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.tx_id.to_string(),
                    new.tx_type.as_str(),
                    TransactionStatus::Pending.as_str(),
                    to_millis(&new.expired_at),
                    new.auth_nonce,
                    new.external_tx_id,
                    new.external_did,
                    to_millis(&now),
                ],
            )?;
            let id = conn.last_insert_rowid();

            let tx = conn.query_row(
                &format!("{} WHERE id = ?1", SELECT_TRANSACTION),
                params![id],
                row_to_transaction,
            )?;
            Ok(tx)
        })
        .await
    }

    async fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_TRANSACTION),
                    params![id],
                    row_to_transaction,
                )
                .optional()?)
        })
        .await
    }

    async fn get_transaction_by_tx_id(&self, tx_id: &Uuid) -> Result<Option<Transaction>> {
        let tx_id = tx_id.to_string();
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    &format!("{} WHERE tx_id = ?1", SELECT_TRANSACTION),
                    params![tx_id],
                    row_to_transaction,
                )
                .optional()?)
        })
        .await
    }

    async fn update_transaction(&self, id: i64, update: &TransactionUpdate) -> Result<Transaction> {
        let update = update.clone();
        self.run(move |conn| {
            let sql_tx = conn.transaction()?;
            let changed = sql_tx.execute(
                "UPDATE transactions SET status = COALESCE(?2, status),
                    auth_nonce = COALESCE(?3, auth_nonce), did = COALESCE(?4, did),
                    certificate_id = COALESCE(?5, certificate_id), pii = COALESCE(?6, pii),
                    updated_at = ?7
                 WHERE id = ?1",
                params![
                    id,
                    update.status.map(|s| s.as_str()),
                    update.auth_nonce,
                    update.did,
                    update.certificate_id,
                    update.pii,
                    to_millis(&Utc::now()),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("transaction {}", id)));
            }

            let stored = sql_tx.query_row(
                &format!("{} WHERE id = ?1", SELECT_TRANSACTION),
                params![id],
                row_to_transaction,
            )?;
            sql_tx.commit()?;
            Ok(stored)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sub-transactions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_sub_transaction(
        &self,
        new: &NewSubTransaction,
    ) -> Result<InsertResult<SubTransaction>> {
        let new = new.clone();
        self.run(move |conn| {
            let sql_tx = conn.transaction()?;

            let known: Option<i64> = sql_tx
                .query_row(
                    "SELECT id FROM transactions WHERE id = ?1",
                    params![new.transaction_id],
                    |row| row.get(0),
                )
                .optional()?;
            if known.is_none() {
                return Err(StoreError::NotFound(format!(
                    "transaction {}",
                    new.transaction_id
                )));
            }

            if let Some(existing) = sub_transaction_at(&sql_tx, new.transaction_id, new.step)? {
                debug!(
                    transaction_id = new.transaction_id,
                    step = new.step,
                    "step already taken"
                );
                return Ok(InsertResult::Conflict { existing });
            }

            let last_step: u32 = sql_tx.query_row(
                "SELECT COALESCE(MAX(step), 0) FROM sub_transactions WHERE transaction_id = ?1",
                params![new.transaction_id],
                |row| row.get(0),
            )?;
            if new.step != last_step + 1 {
                return Err(StoreError::InvalidData(format!(
                    "step {} would leave a gap after {}",
                    new.step, last_step
                )));
            }

            sql_tx.execute(
                "INSERT INTO sub_transactions (transaction_id, step, sub_type, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.transaction_id,
                    new.step,
                    new.sub_type.as_str(),
                    new.status.as_str(),
                    to_millis(&Utc::now()),
                ],
            )?;

            let inserted = sub_transaction_at(&sql_tx, new.transaction_id, new.step)?
                .ok_or_else(|| StoreError::InvalidData("inserted step vanished".into()))?;
            sql_tx.commit()?;
            Ok(InsertResult::Inserted(inserted))
        })
        .await
    }

    async fn claim_step(&self, transaction_id: i64, step: u32) -> Result<bool> {
        self.run(move |conn| {
            let sql_tx = conn.transaction()?;

            let known: Option<i64> = sql_tx
                .query_row(
                    "SELECT id FROM transactions WHERE id = ?1",
                    params![transaction_id],
                    |row| row.get(0),
                )
                .optional()?;
            if known.is_none() {
                return Err(StoreError::NotFound(format!("transaction {}", transaction_id)));
            }

            if sub_transaction_at(&sql_tx, transaction_id, step)?.is_some() {
                debug!(transaction_id, step, "step already recorded");
                return Ok(false);
            }

            let changed = sql_tx.execute(
                "INSERT OR IGNORE INTO step_claims (transaction_id, step, claimed_at)
                 VALUES (?1, ?2, ?3)",
                params![transaction_id, step, to_millis(&Utc::now())],
            )?;
            sql_tx.commit()?;
            if changed == 0 {
                debug!(transaction_id, step, "step already claimed");
            }
            Ok(changed == 1)
        })
        .await
    }

    async fn release_step(&self, transaction_id: i64, step: u32) -> Result<()> {
        self.run(move |conn| {
            conn.execute(
                "DELETE FROM step_claims WHERE transaction_id = ?1 AND step = ?2
                 AND NOT EXISTS (
                    SELECT 1 FROM sub_transactions WHERE transaction_id = ?1 AND step = ?2
                 )",
                params![transaction_id, step],
            )?;
            Ok(())
        })
        .await
    }

    async fn last_sub_transaction(&self, transaction_id: i64) -> Result<Option<SubTransaction>> {
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "{} WHERE transaction_id = ?1 ORDER BY step DESC LIMIT 1",
                        SELECT_SUB_TRANSACTION
                    ),
                    params![transaction_id],
                    row_to_sub_transaction,
                )
                .optional()?)
        })
        .await
    }

    async fn list_sub_transactions(&self, transaction_id: i64) -> Result<Vec<SubTransaction>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE transaction_id = ?1 ORDER BY step ASC",
                SELECT_SUB_TRANSACTION
            ))?;
            let rows = stmt
                .query_map(params![transaction_id], row_to_sub_transaction)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // ECDH sessions
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_ecdh(&self, record: &EcdhRecord) -> Result<InsertResult<EcdhRecord>> {
        let record = record.clone();
        self.run(move |conn| {
            let existing = conn
                .query_row(
                    "SELECT * FROM ecdh_records WHERE transaction_id = ?1",
                    params![record.transaction_id],
                    row_to_ecdh,
                )
                .optional()?;
            if let Some(existing) = existing {
                return Ok(InsertResult::Conflict { existing });
            }

            conn.execute(
                "INSERT INTO ecdh_records (transaction_id, client_did, session_key, merged_nonce,
                    cipher, padding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.transaction_id,
                    record.client_did,
                    record.session_key,
                    record.merged_nonce,
                    record.cipher.as_str(),
                    record.padding.as_str(),
                    to_millis(&record.created_at),
                ],
            )?;
            Ok(InsertResult::Inserted(record))
        })
        .await
    }

    async fn get_ecdh(&self, transaction_id: i64) -> Result<Option<EcdhRecord>> {
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM ecdh_records WHERE transaction_id = ?1",
                    params![transaction_id],
                    row_to_ecdh,
                )
                .optional()?)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Server tokens
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_server_token(
        &self,
        record: &ServerTokenRecord,
    ) -> Result<InsertResult<ServerTokenRecord>> {
        let record = record.clone();
        self.run(move |conn| {
            let existing = conn
                .query_row(
                    "SELECT * FROM server_tokens WHERE transaction_id = ?1",
                    params![record.transaction_id],
                    row_to_server_token,
                )
                .optional()?;
            if let Some(existing) = existing {
                return Ok(InsertResult::Conflict { existing });
            }

            conn.execute(
                "INSERT INTO server_tokens (transaction_id, purpose, token_hash, app_id, wallet_id,
                    expired_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.transaction_id,
                    record.purpose.as_str(),
                    record.token_hash,
                    record.app_id,
                    record.wallet_id,
                    to_millis(&record.expired_at),
                    to_millis(&record.created_at),
                ],
            )?;
            Ok(InsertResult::Inserted(record))
        })
        .await
    }

    async fn find_server_token(
        &self,
        token_hash: &str,
        transaction_id: i64,
    ) -> Result<Option<ServerTokenRecord>> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT * FROM server_tokens WHERE token_hash = ?1 AND transaction_id = ?2",
                    params![token_hash, transaction_id],
                    row_to_server_token,
                )
                .optional()?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tas_core::{
        ServerTokenPurpose, SubTransactionStatus, SubTransactionType, SymmetricCipherType,
        SymmetricPaddingType, TransactionType,
    };

    fn new_transaction() -> NewTransaction {
        NewTransaction {
            tx_id: Uuid::new_v4(),
            tx_type: TransactionType::EntityRegistration,
            expired_at: Utc::now() + Duration::hours(24),
            auth_nonce: "zNonce".into(),
            external_tx_id: Some("ext-1".into()),
            external_did: None,
        }
    }

    fn step(transaction_id: i64, step: u32, sub_type: SubTransactionType) -> NewSubTransaction {
        NewSubTransaction {
            transaction_id,
            step,
            sub_type,
            status: SubTransactionStatus::Success,
        }
    }

    #[tokio::test]
    async fn test_transaction_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let new = new_transaction();
        let tx = store.insert_transaction(&new).await.unwrap();

        assert_eq!(tx.tx_id, new.tx_id);
        assert_eq!(tx.tx_type, TransactionType::EntityRegistration);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.external_tx_id.as_deref(), Some("ext-1"));
        assert_eq!(
            tx.expired_at.timestamp_millis(),
            new.expired_at.timestamp_millis()
        );

        let found = store.get_transaction_by_tx_id(&new.tx_id).await.unwrap();
        assert_eq!(found, Some(tx));
        assert!(store
            .get_transaction_by_tx_id(&Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tx_id() {
        let store = SqliteStore::open_memory().unwrap();
        let new = new_transaction();
        store.insert_transaction(&new).await.unwrap();
        assert!(matches!(
            store.insert_transaction(&new).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_update_transaction() {
        let store = SqliteStore::open_memory().unwrap();
        let tx = store.insert_transaction(&new_transaction()).await.unwrap();
        store
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    pii: Some(vec![1, 2, 3]),
                    did: Some("did:omn:user".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = store
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    status: Some(TransactionStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.pii, Some(vec![1, 2, 3]));
        assert_eq!(stored.did.as_deref(), Some("did:omn:user"));
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.auth_nonce, tx.auth_nonce);

        assert!(matches!(
            store
                .update_transaction(999, &TransactionUpdate::default())
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_step_claims() {
        let store = SqliteStore::open_memory().unwrap();
        let tx = store.insert_transaction(&new_transaction()).await.unwrap();
        store
            .insert_sub_transaction(&step(tx.id, 1, SubTransactionType::Propose))
            .await
            .unwrap();

        assert!(!store.claim_step(tx.id, 1).await.unwrap());
        assert!(store.claim_step(tx.id, 2).await.unwrap());
        assert!(!store.claim_step(tx.id, 2).await.unwrap());

        store.release_step(tx.id, 2).await.unwrap();
        assert!(store.claim_step(tx.id, 2).await.unwrap());

        store
            .insert_sub_transaction(&step(tx.id, 2, SubTransactionType::RequestEcdh))
            .await
            .unwrap();
        store.release_step(tx.id, 2).await.unwrap();
        assert!(!store.claim_step(tx.id, 2).await.unwrap());

        assert!(matches!(
            store.claim_step(999, 1).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_steps_are_unique_and_gapless() {
        let store = SqliteStore::open_memory().unwrap();
        let tx = store.insert_transaction(&new_transaction()).await.unwrap();

        for (n, t) in [
            SubTransactionType::Propose,
            SubTransactionType::RequestEcdh,
            SubTransactionType::RequestCreateToken,
        ]
        .into_iter()
        .enumerate()
        {
            let r = store
                .insert_sub_transaction(&step(tx.id, n as u32 + 1, t))
                .await
                .unwrap();
            assert!(r.is_inserted());
        }

        let replay = store
            .insert_sub_transaction(&step(tx.id, 2, SubTransactionType::RequestEcdh))
            .await
            .unwrap();
        assert!(matches!(replay, InsertResult::Conflict { .. }));

        assert!(matches!(
            store
                .insert_sub_transaction(&step(tx.id, 9, SubTransactionType::Confirm))
                .await,
            Err(StoreError::InvalidData(_))
        ));

        let steps = store.list_sub_transactions(tx.id).await.unwrap();
        assert_eq!(
            steps.iter().map(|s| s.step).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let last = store.last_sub_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(last.sub_type, SubTransactionType::RequestCreateToken);
    }

    #[tokio::test]
    async fn test_unknown_transaction_step() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(matches!(
            store
                .insert_sub_transaction(&step(42, 1, SubTransactionType::Propose))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ecdh_and_token_write_once() {
        let store = SqliteStore::open_memory().unwrap();
        let tx = store.insert_transaction(&new_transaction()).await.unwrap();
        let now = Utc::now();

        let ecdh = EcdhRecord {
            transaction_id: tx.id,
            client_did: "did:omn:wallet".into(),
            session_key: "zKey".into(),
            merged_nonce: Some("zMerged".into()),
            cipher: SymmetricCipherType::Aes128Cbc,
            padding: SymmetricPaddingType::NoPad,
            created_at: now,
        };
        assert!(store.insert_ecdh(&ecdh).await.unwrap().is_inserted());
        assert!(!store.insert_ecdh(&ecdh).await.unwrap().is_inserted());
        let stored = store.get_ecdh(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.cipher, SymmetricCipherType::Aes128Cbc);
        assert_eq!(stored.merged_nonce.as_deref(), Some("zMerged"));

        let token = ServerTokenRecord {
            transaction_id: tx.id,
            purpose: ServerTokenPurpose::IssueVc,
            token_hash: "zHash".into(),
            app_id: "app".into(),
            wallet_id: "wallet".into(),
            expired_at: now,
            created_at: now,
        };
        assert!(store.insert_server_token(&token).await.unwrap().is_inserted());
        assert!(!store.insert_server_token(&token).await.unwrap().is_inserted());

        let found = store.find_server_token("zHash", tx.id).await.unwrap().unwrap();
        assert_eq!(found.purpose, ServerTokenPurpose::IssueVc);
        assert!(store.find_server_token("zHash", tx.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tas.db");
        let new = new_transaction();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_transaction(&new).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store
            .get_transaction_by_tx_id(&new.tx_id)
            .await
            .unwrap()
            .is_some());
    }
}
