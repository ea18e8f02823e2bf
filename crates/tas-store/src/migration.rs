//! Versioned SQLite schema for transactions, steps, sessions and tokens.
//!
//! Each migration is a SQL batch that moves the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 3;

/// Initialize or migrate the database schema.
///
/// Safe to call on every open; applied versions are skipped.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        3 => apply_v3(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: transactions and their step log.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_id TEXT NOT NULL UNIQUE,        -- UUID, hyphenated
            tx_type TEXT NOT NULL,
            status TEXT NOT NULL,              -- PENDING | COMPLETED
            expired_at INTEGER NOT NULL,       -- Unix ms
            auth_nonce TEXT NOT NULL,          -- multibase
            did TEXT,
            external_tx_id TEXT,
            external_did TEXT,
            certificate_id TEXT,
            pii BLOB,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Append-only; the unique position is the concurrency guard
        CREATE TABLE sub_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL REFERENCES transactions(id),
            step INTEGER NOT NULL,
            sub_type TEXT NOT NULL,
            status TEXT NOT NULL,              -- SUCCESS | ERROR
            created_at INTEGER NOT NULL,

            UNIQUE(transaction_id, step)
        );

        CREATE TABLE ecdh_records (
            transaction_id INTEGER PRIMARY KEY REFERENCES transactions(id),
            client_did TEXT NOT NULL,
            session_key TEXT NOT NULL,         -- multibase
            merged_nonce TEXT NOT NULL,        -- multibase
            cipher TEXT NOT NULL,
            padding TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE server_tokens (
            transaction_id INTEGER PRIMARY KEY REFERENCES transactions(id),
            purpose TEXT NOT NULL,
            token_hash TEXT NOT NULL,          -- multibase SHA-256
            app_id TEXT NOT NULL,
            wallet_id TEXT NOT NULL,
            expired_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX idx_sub_transactions_tx ON sub_transactions(transaction_id, step);
        CREATE INDEX idx_server_tokens_hash ON server_tokens(token_hash);
        "#,
    )?;

    Ok(())
}

/// Migration v2: the merged nonce becomes optional.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE ecdh_records_v2 (
            transaction_id INTEGER PRIMARY KEY REFERENCES transactions(id),
            client_did TEXT NOT NULL,
            session_key TEXT NOT NULL,
            merged_nonce TEXT,
            cipher TEXT NOT NULL,
            padding TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        INSERT INTO ecdh_records_v2 SELECT * FROM ecdh_records;
        DROP TABLE ecdh_records;
        ALTER TABLE ecdh_records_v2 RENAME TO ecdh_records;

        CREATE INDEX idx_transactions_external ON transactions(external_tx_id);
        "#,
    )?;

    Ok(())
}

/// Migration v3: claims on steps whose work is in flight.
fn apply_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE step_claims (
            transaction_id INTEGER NOT NULL REFERENCES transactions(id),
            step INTEGER NOT NULL,
            claimed_at INTEGER NOT NULL,
            PRIMARY KEY (transaction_id, step)
        );
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "transactions",
            "sub_transactions",
            "ecdh_records",
            "server_tokens",
            "step_claims",
            "schema_migrations",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_v2_preserves_sessions() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL);",
        )
        .unwrap();
        apply_v1(&conn).unwrap();
        conn.execute("INSERT INTO schema_migrations VALUES (1, 0)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO transactions (tx_id, tx_type, status, expired_at, auth_nonce, created_at, updated_at)
             VALUES ('t', 'ISSUE_VC', 'PENDING', 0, 'z', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO ecdh_records VALUES (1, 'did:omn:a', 'zKey', 'zMerged', 'AES-256-CBC', 'PKCS5', 0)",
            [],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let merged: Option<String> = conn
            .query_row("SELECT merged_nonce FROM ecdh_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(merged.as_deref(), Some("zMerged"));
        conn.execute(
            "UPDATE ecdh_records SET merged_nonce = NULL WHERE transaction_id = 1",
            [],
        )
        .unwrap();
    }
}
