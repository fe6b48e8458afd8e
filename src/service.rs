//! Cluster Service
//!
//! Runs each cluster operation as exactly one store transaction and fires
//! allocator notifications only after that transaction has committed.
//! Allocator failures are logged and never undo a committed change; the
//! allocator can be rebuilt from the store with
//! [`MemoryAllocator::load_from_store`](crate::allocator::MemoryAllocator::load_from_store).

use std::sync::Arc;

use crate::allocator::Allocator;
use crate::api::{ClusterInfoResponse, ClusterListResponse};
use crate::entry::ClusterEntry;
use crate::error::{Error, Result};
use crate::id::{IdGenerator, UuidGenerator};
use crate::store::EntryStore;

/// Cluster operations over an entry store and an allocator
pub struct ClusterService {
    store: Arc<EntryStore>,
    allocator: Arc<dyn Allocator>,
    ids: Arc<dyn IdGenerator>,
}

impl ClusterService {
    /// Create a service that issues random cluster ids
    pub fn new(store: Arc<EntryStore>, allocator: Arc<dyn Allocator>) -> Self {
        Self::with_id_generator(store, allocator, Arc::new(UuidGenerator))
    }

    /// Create a service with a custom id source
    pub fn with_id_generator(
        store: Arc<EntryStore>,
        allocator: Arc<dyn Allocator>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            allocator,
            ids,
        }
    }

    /// Create an empty cluster
    pub async fn create(&self) -> Result<ClusterInfoResponse> {
        let entry = ClusterEntry::with_id(self.ids.next_id());

        let info = self
            .store
            .with_write_tx(|tx| {
                if tx.exists::<ClusterEntry>(&entry.id)? {
                    return Err(Error::Conflict(format!(
                        "Cluster id {} is already in use",
                        entry.id
                    )));
                }
                entry.save(tx)?;
                entry.to_response(tx)
            })
            .await?;

        if let Err(e) = self.allocator.add_cluster(&info.id).await {
            tracing::warn!("Allocator not updated for new cluster [{}]: {}", info.id, e);
        }

        tracing::info!("Created cluster [{}]", info.id);
        Ok(info)
    }

    /// Ids of all clusters
    pub async fn list(&self) -> Result<ClusterListResponse> {
        let clusters = self.store.with_read_tx(|tx| ClusterEntry::list(tx)).await?;
        Ok(ClusterListResponse { clusters })
    }

    /// Details of one cluster
    pub async fn info(&self, id: &str) -> Result<ClusterInfoResponse> {
        self.store
            .with_read_tx(|tx| ClusterEntry::load(tx, id)?.to_response(tx))
            .await
    }

    /// Delete a cluster that has no nodes or volumes
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .with_write_tx(|tx| ClusterEntry::load(tx, id)?.delete(tx))
            .await?;

        if let Err(e) = self.allocator.remove_cluster(id).await {
            tracing::warn!("Allocator not updated for deleted cluster [{}]: {}", id, e);
        }

        tracing::info!("Deleted cluster [{}]", id);
        Ok(())
    }

    // ============ Dependents ============

    /// Record that `node_id` belongs to the cluster
    pub async fn attach_node(&self, cluster_id: &str, node_id: &str) -> Result<ClusterInfoResponse> {
        let (info, added) = self
            .modify(cluster_id, |entry| Ok(entry.node_add(node_id)))
            .await?;

        if added {
            if let Err(e) = self.allocator.add_node(cluster_id, node_id).await {
                tracing::warn!(
                    "Allocator not updated for node [{}] joining cluster [{}]: {}",
                    node_id,
                    cluster_id,
                    e
                );
            }
        }

        Ok(info)
    }

    /// Remove `node_id` from the cluster
    pub async fn detach_node(&self, cluster_id: &str, node_id: &str) -> Result<ClusterInfoResponse> {
        let (info, ()) = self
            .modify(cluster_id, |entry| entry.node_delete(node_id))
            .await?;

        if let Err(e) = self.allocator.remove_node(cluster_id, node_id).await {
            tracing::warn!(
                "Allocator not updated for node [{}] leaving cluster [{}]: {}",
                node_id,
                cluster_id,
                e
            );
        }

        Ok(info)
    }

    /// Record that `volume_id` belongs to the cluster
    pub async fn attach_volume(&self, cluster_id: &str, volume_id: &str) -> Result<ClusterInfoResponse> {
        let (info, _) = self
            .modify(cluster_id, |entry| Ok(entry.volume_add(volume_id)))
            .await?;
        Ok(info)
    }

    /// Remove `volume_id` from the cluster
    pub async fn detach_volume(&self, cluster_id: &str, volume_id: &str) -> Result<ClusterInfoResponse> {
        let (info, ()) = self
            .modify(cluster_id, |entry| entry.volume_delete(volume_id))
            .await?;
        Ok(info)
    }

    async fn modify<T, F>(&self, cluster_id: &str, f: F) -> Result<(ClusterInfoResponse, T)>
    where
        T: Send,
        F: FnOnce(&mut ClusterEntry) -> Result<T> + Send,
    {
        self.store
            .with_write_tx(|tx| {
                let out = ClusterEntry::modify(tx, cluster_id, f)?;
                let info = ClusterEntry::load(tx, cluster_id)?.to_response(tx)?;
                Ok((info, out))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::MemoryAllocator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out c1, c2, ...
    struct SequentialIds(AtomicUsize);

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> String {
            format!("c{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    /// Always returns the same id
    struct FixedId;

    impl IdGenerator for FixedId {
        fn next_id(&self) -> String {
            "same".to_string()
        }
    }

    struct BrokenAllocator;

    #[async_trait::async_trait]
    impl Allocator for BrokenAllocator {
        async fn add_cluster(&self, _: &str) -> Result<()> {
            Err(Error::Allocator("offline".into()))
        }

        async fn add_node(&self, _: &str, _: &str) -> Result<()> {
            Err(Error::Allocator("offline".into()))
        }

        async fn remove_node(&self, _: &str, _: &str) -> Result<()> {
            Err(Error::Allocator("offline".into()))
        }

        async fn remove_cluster(&self, _: &str) -> Result<()> {
            Err(Error::Allocator("offline".into()))
        }
    }

    fn service() -> (Arc<ClusterService>, Arc<MemoryAllocator>) {
        let store = Arc::new(EntryStore::open_in_memory().unwrap());
        let allocator = Arc::new(MemoryAllocator::new());
        let service = ClusterService::with_id_generator(
            store,
            allocator.clone(),
            Arc::new(SequentialIds(AtomicUsize::new(0))),
        );
        (Arc::new(service), allocator)
    }

    #[tokio::test]
    async fn test_create_info_delete() {
        let (service, _) = service();

        let created = service.create().await.unwrap();
        assert_eq!(created.id, "c1");
        assert!(created.nodes.is_empty());
        assert!(created.volumes.is_empty());

        assert_eq!(service.info("c1").await.unwrap(), created);

        service.delete("c1").await.unwrap();
        assert!(service.info("c1").await.unwrap_err().is_not_found());
        assert!(service.list().await.unwrap().clusters.is_empty());
    }

    #[tokio::test]
    async fn test_created_ids_are_unique() {
        let store = Arc::new(EntryStore::open_in_memory().unwrap());
        let service = ClusterService::new(store, Arc::new(MemoryAllocator::new()));

        let mut ids = std::collections::HashSet::new();
        for _ in 0..50 {
            assert!(ids.insert(service.create().await.unwrap().id));
        }
        assert_eq!(service.list().await.unwrap().clusters.len(), 50);
    }

    #[tokio::test]
    async fn test_repeated_id_is_refused() {
        let store = Arc::new(EntryStore::open_in_memory().unwrap());
        let service = ClusterService::with_id_generator(
            store,
            Arc::new(MemoryAllocator::new()),
            Arc::new(FixedId),
        );

        service.attach_volume("same", "v1").await.unwrap_err();
        service.create().await.unwrap();
        service.attach_volume("same", "v1").await.unwrap();

        let err = service.create().await.unwrap_err();
        assert!(err.is_conflict());

        // The existing cluster was not overwritten
        assert_eq!(service.info("same").await.unwrap().volumes, vec!["v1"]);
    }

    #[tokio::test]
    async fn test_list_after_creates_and_deletes() {
        let (service, _) = service();
        for _ in 0..6 {
            service.create().await.unwrap();
        }
        for id in ["c2", "c4", "c5"] {
            service.delete(id).await.unwrap();
        }

        let list = service.list().await.unwrap();
        assert_eq!(list.clusters, vec!["c1", "c3", "c6"]);
        for id in &list.clusters {
            service.info(id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_delete_missing_cluster() {
        let (service, _) = service();
        assert!(service.delete("c1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_volume() {
        let (service, _) = service();
        service.create().await.unwrap();
        service.attach_volume("c1", "v1").await.unwrap();

        let before = service.info("c1").await.unwrap();
        assert!(service.delete("c1").await.unwrap_err().is_conflict());
        assert_eq!(service.info("c1").await.unwrap(), before);

        service.detach_volume("c1", "v1").await.unwrap();
        service.delete("c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_node_changes_reach_allocator() {
        let (service, allocator) = service();
        service.create().await.unwrap();

        let info = service.attach_node("c1", "n1").await.unwrap();
        assert_eq!(info.nodes, vec!["n1"]);
        assert_eq!(allocator.nodes("c1").await.unwrap(), vec!["n1"]);

        assert!(service.delete("c1").await.unwrap_err().is_conflict());
        assert!(allocator.contains("c1").await);

        service.detach_node("c1", "n1").await.unwrap();
        assert!(allocator.nodes("c1").await.unwrap().is_empty());

        service.delete("c1").await.unwrap();
        assert!(!allocator.contains("c1").await);
    }

    /// The allocator a daemon would rebuild on restart
    async fn rebuilt(service: &ClusterService) -> MemoryAllocator {
        let allocator = MemoryAllocator::new();
        allocator.load_from_store(&service.store).await.unwrap();
        allocator
    }

    async fn assert_same_view(live: &MemoryAllocator, rebuilt: &MemoryAllocator) {
        let clusters = live.clusters().await;
        assert_eq!(clusters, rebuilt.clusters().await);
        for id in &clusters {
            assert_eq!(live.nodes(id).await, rebuilt.nodes(id).await, "cluster {}", id);
        }
    }

    #[tokio::test]
    async fn test_allocator_matches_store_after_each_change() {
        let (service, allocator) = service();

        service.create().await.unwrap();
        service.create().await.unwrap();
        assert_eq!(allocator.clusters().await, vec!["c1", "c2"]);
        assert_same_view(&allocator, &rebuilt(&service).await).await;

        service.attach_node("c1", "n1").await.unwrap();
        service.attach_node("c1", "n2").await.unwrap();
        assert_same_view(&allocator, &rebuilt(&service).await).await;

        service.detach_node("c1", "n1").await.unwrap();
        assert_same_view(&allocator, &rebuilt(&service).await).await;

        service.delete("c2").await.unwrap();
        assert_eq!(allocator.clusters().await, vec!["c1"]);
        assert_same_view(&allocator, &rebuilt(&service).await).await;
    }

    #[tokio::test]
    async fn test_detach_unknown_dependent() {
        let (service, _) = service();
        service.create().await.unwrap();
        assert!(service.detach_volume("c1", "v9").await.unwrap_err().is_not_found());
        assert!(service.detach_node("c1", "n9").await.unwrap_err().is_not_found());
        assert!(service.attach_node("c9", "n1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_allocator_failure_keeps_delete() {
        let store = Arc::new(EntryStore::open_in_memory().unwrap());
        let service = ClusterService::with_id_generator(
            store,
            Arc::new(BrokenAllocator),
            Arc::new(SequentialIds(AtomicUsize::new(0))),
        );

        let created = service.create().await.unwrap();
        assert_eq!(created.id, "c1");
        service.attach_node("c1", "n1").await.unwrap();
        service.detach_node("c1", "n1").await.unwrap();
        service.delete("c1").await.unwrap();

        assert!(service.info("c1").await.unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deletes() {
        let (service, _) = service();
        service.create().await.unwrap();

        let mut handles = vec![];
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move { service.delete("c1").await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(e) => assert!(e.is_not_found(), "unexpected error: {}", e),
            }
        }
        assert_eq!(succeeded, 1);

        assert!(service.list().await.unwrap().clusters.is_empty());
        assert!(service.info("c1").await.unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_attach_racing_delete() {
        for _ in 0..20 {
            let (service, _) = service();
            let id = service.create().await.unwrap().id;

            let attach = {
                let service = Arc::clone(&service);
                let id = id.clone();
                tokio::spawn(async move { service.attach_volume(&id, "v1").await })
            };
            let delete = {
                let service = Arc::clone(&service);
                let id = id.clone();
                tokio::spawn(async move { service.delete(&id).await })
            };

            let attached = attach.await.unwrap();
            let deleted = delete.await.unwrap();

            match (attached, deleted) {
                // Attach first: the delete must see the volume
                (Ok(_), Err(e)) => {
                    assert!(e.is_conflict());
                    assert_eq!(service.info(&id).await.unwrap().volumes, vec!["v1"]);
                }
                // Delete first: the attach finds nothing
                (Err(e), Ok(())) => {
                    assert!(e.is_not_found());
                    assert!(service.list().await.unwrap().clusters.is_empty());
                }
                (a, d) => panic!("both or neither succeeded: {:?} / {:?}", a, d),
            }
        }
    }
}
