//! In-memory Allocator
//!
//! Tracks cluster membership for placement decisions.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use super::Allocator;
use crate::entry::ClusterEntry;
use crate::error::{Error, Result};
use crate::store::EntryStore;

/// Allocator state held in memory
#[derive(Default)]
pub struct MemoryAllocator {
    /// Cluster id -> node ids
    clusters: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild allocator state from the clusters currently in the store
    pub async fn load_from_store(&self, store: &EntryStore) -> Result<usize> {
        let entries = store
            .with_read_tx(|tx| {
                ClusterEntry::list(tx)?
                    .into_iter()
                    .map(|id| ClusterEntry::load(tx, &id))
                    .collect::<Result<Vec<_>>>()
            })
            .await?;

        let mut clusters = self.clusters.write().await;
        clusters.clear();
        for entry in entries {
            clusters.insert(entry.id, entry.nodes);
        }

        tracing::info!("Allocator loaded {} cluster(s) from store", clusters.len());
        Ok(clusters.len())
    }

    /// Ids of all clusters known to the allocator
    pub async fn clusters(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clusters.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Nodes the allocator may place on for `cluster_id`
    pub async fn nodes(&self, cluster_id: &str) -> Option<Vec<String>> {
        self.clusters
            .read()
            .await
            .get(cluster_id)
            .map(|nodes| nodes.iter().cloned().collect())
    }

    /// Whether the allocator knows about `cluster_id`
    pub async fn contains(&self, cluster_id: &str) -> bool {
        self.clusters.read().await.contains_key(cluster_id)
    }
}

#[async_trait::async_trait]
impl Allocator for MemoryAllocator {
    async fn add_cluster(&self, cluster_id: &str) -> Result<()> {
        self.clusters
            .write()
            .await
            .entry(cluster_id.to_string())
            .or_default();
        Ok(())
    }

    async fn add_node(&self, cluster_id: &str, node_id: &str) -> Result<()> {
        self.clusters
            .write()
            .await
            .entry(cluster_id.to_string())
            .or_default()
            .insert(node_id.to_string());
        Ok(())
    }

    async fn remove_node(&self, cluster_id: &str, node_id: &str) -> Result<()> {
        let mut clusters = self.clusters.write().await;
        let nodes = clusters.get_mut(cluster_id).ok_or_else(|| {
            Error::Allocator(format!("Cluster {} is not tracked", cluster_id))
        })?;
        if !nodes.remove(node_id) {
            return Err(Error::Allocator(format!(
                "Node {} is not tracked in cluster {}",
                node_id, cluster_id
            )));
        }
        Ok(())
    }

    async fn remove_cluster(&self, cluster_id: &str) -> Result<()> {
        // Untracked clusters are not an error
        self.clusters.write().await.remove(cluster_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_remove_nodes() {
        let allocator = MemoryAllocator::new();
        allocator.add_node("c1", "n1").await.unwrap();
        allocator.add_node("c1", "n2").await.unwrap();
        allocator.add_node("c2", "n3").await.unwrap();

        assert_eq!(allocator.clusters().await, vec!["c1", "c2"]);
        assert_eq!(allocator.nodes("c1").await.unwrap(), vec!["n1", "n2"]);

        allocator.remove_node("c1", "n1").await.unwrap();
        assert_eq!(allocator.nodes("c1").await.unwrap(), vec!["n2"]);
        assert!(allocator.remove_node("c1", "n1").await.is_err());
        assert!(allocator.remove_node("c9", "n1").await.is_err());
    }

    #[tokio::test]
    async fn test_add_cluster_keeps_nodes() {
        let allocator = MemoryAllocator::new();
        allocator.add_cluster("c1").await.unwrap();
        assert!(allocator.contains("c1").await);
        assert!(allocator.nodes("c1").await.unwrap().is_empty());

        allocator.add_node("c1", "n1").await.unwrap();
        allocator.add_cluster("c1").await.unwrap();
        assert_eq!(allocator.nodes("c1").await.unwrap(), vec!["n1"]);
    }

    #[tokio::test]
    async fn test_remove_cluster() {
        let allocator = MemoryAllocator::new();
        allocator.add_node("c1", "n1").await.unwrap();

        allocator.remove_cluster("c1").await.unwrap();
        assert!(!allocator.contains("c1").await);

        // Unknown clusters are fine
        allocator.remove_cluster("c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = EntryStore::open_in_memory().unwrap();
        store
            .with_write_tx(|tx| {
                let mut a = ClusterEntry::with_id("a");
                a.node_add("n1");
                a.save(tx)?;
                ClusterEntry::with_id("b").save(tx)
            })
            .await
            .unwrap();

        let allocator = MemoryAllocator::new();
        allocator.add_node("stale", "n0").await.unwrap();

        assert_eq!(allocator.load_from_store(&store).await.unwrap(), 2);
        assert_eq!(allocator.clusters().await, vec!["a", "b"]);
        assert_eq!(allocator.nodes("a").await.unwrap(), vec!["n1"]);
        assert!(allocator.nodes("b").await.unwrap().is_empty());
    }
}
