//! Entry Module
//!
//! Transaction-scoped views of persisted entities. An entry is loaded,
//! inspected or changed, and saved inside one transaction; nothing holds on
//! to an entry after its transaction ends.

mod cluster;

pub use cluster::ClusterEntry;
