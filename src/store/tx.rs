//! Store Transactions
//!
//! A [`Tx`] wraps one SQLite transaction. It only exists inside the closure
//! passed to [`EntryStore::with_read_tx`](super::EntryStore::with_read_tx) or
//! [`EntryStore::with_write_tx`](super::EntryStore::with_write_tx), which
//! decide whether it commits or rolls back.

use rusqlite::{params, OptionalExtension, Transaction};

use super::DbEntry;
use crate::error::{Error, Result};

/// A transaction against the entry store
pub struct Tx<'conn> {
    inner: Transaction<'conn>,
    writable: bool,
}

impl<'conn> Tx<'conn> {
    pub(super) fn new(inner: Transaction<'conn>, writable: bool) -> Self {
        Self { inner, writable }
    }

    /// Get the raw value stored under `bucket/id`
    pub fn get(&self, bucket: &str, id: &str) -> Result<Vec<u8>> {
        self.get_opt(bucket, id)?
            .ok_or_else(|| Error::not_found("Entry", id))
    }

    /// Check whether `bucket/id` exists
    pub fn contains(&self, bucket: &str, id: &str) -> Result<bool> {
        let count: i64 = self.inner.query_row(
            "SELECT COUNT(*) FROM entries WHERE bucket = ?1 AND id = ?2",
            params![bucket, id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Store a raw value under `bucket/id`, replacing any previous value
    pub fn put(&self, bucket: &str, id: &str, value: &[u8]) -> Result<()> {
        self.check_writable()?;
        self.inner.execute(
            r#"
            INSERT INTO entries (bucket, id, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(bucket, id) DO UPDATE SET value = ?3, updated_at = CURRENT_TIMESTAMP
            "#,
            params![bucket, id, value],
        )?;
        Ok(())
    }

    /// Remove `bucket/id`
    ///
    /// Fails with `NotFound` when there is nothing to remove.
    pub fn delete(&self, bucket: &str, id: &str) -> Result<()> {
        self.check_writable()?;
        let deleted = self.inner.execute(
            "DELETE FROM entries WHERE bucket = ?1 AND id = ?2",
            params![bucket, id],
        )?;
        if deleted == 0 {
            return Err(Error::not_found("Entry", id));
        }
        Ok(())
    }

    /// List every key in `bucket`, in ascending byte order
    pub fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .inner
            .prepare("SELECT id FROM entries WHERE bucket = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![bucket], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for result in rows {
            keys.push(result?);
        }

        Ok(keys)
    }

    // ============ Typed access ============

    /// Load and decode an entry by id
    pub fn load<E: DbEntry>(&self, id: &str) -> Result<E> {
        let bytes = self
            .get_opt(E::BUCKET, id)?
            .ok_or_else(|| Error::not_found(E::KIND, id))?;

        bincode::deserialize(&bytes).map_err(|e| Error::Corrupted {
            bucket: E::BUCKET,
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Encode and store an entry under its id
    pub fn save<E: DbEntry>(&self, entry: &E) -> Result<()> {
        let bytes = bincode::serialize(entry)?;
        self.put(E::BUCKET, entry.id(), &bytes)
    }

    /// Remove an entry by id
    pub fn remove<E: DbEntry>(&self, id: &str) -> Result<()> {
        self.delete(E::BUCKET, id).map_err(|e| match e {
            Error::NotFound { id, .. } => Error::not_found(E::KIND, id),
            other => other,
        })
    }

    /// List the ids of all entries of type `E`
    pub fn keys<E: DbEntry>(&self) -> Result<Vec<String>> {
        self.list_keys(E::BUCKET)
    }

    /// Check whether an entry of type `E` exists
    pub fn exists<E: DbEntry>(&self, id: &str) -> Result<bool> {
        self.contains(E::BUCKET, id)
    }

    // ============ Lifecycle ============

    pub(super) fn commit(self) -> Result<()> {
        self.inner.commit()?;
        Ok(())
    }

    pub(super) fn rollback(self) -> Result<()> {
        self.inner.rollback()?;
        Ok(())
    }

    fn get_opt(&self, bucket: &str, id: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .inner
            .query_row(
                "SELECT value FROM entries WHERE bucket = ?1 AND id = ?2",
                params![bucket, id],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn check_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(Error::ReadOnly)
        }
    }
}
