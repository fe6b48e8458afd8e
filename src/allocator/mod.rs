//! Allocator Module
//!
//! The allocator keeps its own in-memory view of which nodes each cluster
//! can place bricks on. The entry store is the source of truth; the allocator
//! is told about changes after they commit and can be rebuilt from the store.

mod memory;

pub use memory::MemoryAllocator;

use crate::error::Result;

/// Placement subsystem notified of committed cluster membership changes
///
/// Notifications are best-effort: callers log a failure and move on, the
/// committed store change stands either way.
#[async_trait::async_trait]
pub trait Allocator: Send + Sync {
    /// A cluster was created
    async fn add_cluster(&self, cluster_id: &str) -> Result<()>;

    /// A node joined a cluster
    async fn add_node(&self, cluster_id: &str, node_id: &str) -> Result<()>;

    /// A node left a cluster
    async fn remove_node(&self, cluster_id: &str, node_id: &str) -> Result<()>;

    /// A cluster was deleted
    async fn remove_cluster(&self, cluster_id: &str) -> Result<()>;
}
