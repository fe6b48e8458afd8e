//! Brickyard - Cluster Metadata Service
//!
//! Keeps the authoritative list of storage clusters for a distributed
//! storage control plane, persisted in an embedded transactional store and
//! exposed over a small REST API.
//!
//! # Architecture
//!
//! Every request runs as exactly one store transaction that commits or rolls
//! back as a whole. Side effects outside the store, such as telling the
//! allocator that a cluster is gone, happen only after the commit.
//!
//! # Features
//!
//! - SQLite-backed entry store with scoped read/write transactions
//! - Referential integrity: clusters with nodes or volumes cannot be deleted
//! - Best-effort allocator notification, rebuildable from the store
//! - HTTP API and the `brickctl` command line client

pub mod config;
pub mod error;
pub mod id;
pub mod store;
pub mod entry;
pub mod allocator;
pub mod service;
pub mod api;

pub use config::BrickyardConfig;
pub use error::{Error, ErrorKind, Result};
