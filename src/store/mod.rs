//! Entry Store Module
//!
//! Embedded, transactional key-value storage for entries. Every entity type
//! lives in its own bucket; all access happens inside a scoped read or write
//! transaction handed out by [`EntryStore`].

mod db;
mod tx;

pub use db::{EntryStore, SCHEMA_VERSION};
pub use tx::Tx;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity persisted in the entry store
pub trait DbEntry: Serialize + DeserializeOwned {
    /// Bucket (partition) holding entries of this type
    const BUCKET: &'static str;

    /// Human readable entity name used in error messages
    const KIND: &'static str;

    /// Primary key of this entry
    fn id(&self) -> &str;
}
