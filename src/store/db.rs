//! Entry Store
//!
//! SQLite-backed store. One connection serves all requests; the connection
//! lock serializes transactions, so a write transaction observes and
//! modifies state that no other transaction can touch until it finishes.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::sync::Mutex;

use super::Tx;
use crate::error::{Error, Result};

/// On-disk schema version written by this build
pub const SCHEMA_VERSION: i64 = 1;

/// Persistent entry store backed by SQLite
pub struct EntryStore {
    /// Database connection
    conn: Mutex<Connection>,
}

impl EntryStore {
    /// Create or open the store at `path`
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Entry store journal mode: {}", mode);

        let store = Self::init(conn)?;
        tracing::info!("Entry store opened at {}", path.display());
        Ok(store)
    }

    /// Open a store that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                bucket TEXT NOT NULL,
                id TEXT NOT NULL,
                value BLOB NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (bucket, id)
            );
            "#,
        )?;

        let version: Option<i64> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match version {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(v) if v > SCHEMA_VERSION => {
                return Err(Error::Store(format!(
                    "Database schema version {} is newer than supported version {}",
                    v, SCHEMA_VERSION
                )));
            }
            Some(_) => {}
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a read-only transaction
    ///
    /// The transaction is always released when `f` returns, whatever the outcome.
    /// SQLite calls block the current worker, for up to the busy timeout when
    /// another process holds the database lock.
    pub async fn with_read_tx<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T> + Send,
    {
        let mut conn = self.conn.lock().await;
        let tx = Tx::new(
            conn.transaction_with_behavior(TransactionBehavior::Deferred)?,
            false,
        );
        Self::finish(tx, f)
    }

    /// Run `f` inside a write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err` or
    /// panics. Nothing `f` wrote is visible to anyone unless it commits.
    pub async fn with_write_tx<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T> + Send,
    {
        let mut conn = self.conn.lock().await;
        let tx = Tx::new(
            conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
            true,
        );
        Self::finish(tx, f)
    }

    fn finish<T, F>(tx: Tx<'_>, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T>,
    {
        // A panic in `f` drops `tx`, which rolls it back.
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("Transaction aborted: {}", e);
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!("Failed to roll back transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
