//! Cluster Entry
//!
//! Persisted state of one cluster: its id and the ids of the nodes and
//! volumes that belong to it. A cluster with any node or volume attached
//! cannot be deleted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::api::ClusterInfoResponse;
use crate::error::{Error, Result};
use crate::id::generate_id;
use crate::store::{DbEntry, Tx};

/// One cluster as stored in the `clusters` bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEntry {
    /// Cluster id, immutable once assigned
    pub id: String,
    /// Ids of nodes in this cluster
    pub nodes: BTreeSet<String>,
    /// Ids of volumes in this cluster
    pub volumes: BTreeSet<String>,
}

impl DbEntry for ClusterEntry {
    const BUCKET: &'static str = "clusters";
    const KIND: &'static str = "Cluster";

    fn id(&self) -> &str {
        &self.id
    }
}

impl ClusterEntry {
    /// Create a cluster with a freshly generated id and no dependents
    pub fn new() -> Self {
        Self::with_id(generate_id())
    }

    /// Create a cluster with the given id and no dependents
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: BTreeSet::new(),
            volumes: BTreeSet::new(),
        }
    }

    /// Load a cluster by id
    pub fn load(tx: &Tx<'_>, id: &str) -> Result<Self> {
        tx.load(id)
    }

    /// Ids of all clusters, in ascending order
    pub fn list(tx: &Tx<'_>) -> Result<Vec<String>> {
        tx.keys::<Self>()
    }

    /// Write this cluster, replacing any stored copy
    pub fn save(&self, tx: &Tx<'_>) -> Result<()> {
        tx.save(self)
    }

    /// Load, change and save a cluster in one step
    ///
    /// Nothing is saved when `f` fails.
    pub fn modify<T, F>(tx: &Tx<'_>, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut entry = Self::load(tx, id)?;
        let out = f(&mut entry)?;
        entry.save(tx)?;
        Ok(out)
    }

    /// Delete this cluster
    ///
    /// The dependent sets are read back from the store within `tx`, so a
    /// stale in-memory copy can never bypass the check. Nothing is written
    /// when the cluster still has nodes or volumes.
    pub fn delete(&self, tx: &Tx<'_>) -> Result<()> {
        let current = Self::load(tx, &self.id)?;
        if current.has_dependents() {
            return Err(Error::Conflict(format!(
                "Cluster {} still has {} node(s) and {} volume(s)",
                current.id,
                current.nodes.len(),
                current.volumes.len()
            )));
        }

        tx.remove::<Self>(&self.id)
    }

    /// Build the API representation from the state visible in `tx`
    pub fn to_response(&self, tx: &Tx<'_>) -> Result<ClusterInfoResponse> {
        let current = Self::load(tx, &self.id).map_err(|e| match e {
            Error::NotFound { .. } => {
                Error::Store(format!("Cluster {} disappeared during the request", self.id))
            }
            other => other,
        })?;

        Ok(ClusterInfoResponse {
            id: current.id,
            nodes: current.nodes.into_iter().collect(),
            volumes: current.volumes.into_iter().collect(),
        })
    }

    /// Whether any node or volume still references this cluster
    pub fn has_dependents(&self) -> bool {
        !self.nodes.is_empty() || !self.volumes.is_empty()
    }

    /// Attach a node; returns false if it was already attached
    pub fn node_add(&mut self, node_id: impl Into<String>) -> bool {
        self.nodes.insert(node_id.into())
    }

    /// Detach a node
    pub fn node_delete(&mut self, node_id: &str) -> Result<()> {
        if !self.nodes.remove(node_id) {
            return Err(Error::not_found("Node", node_id));
        }
        Ok(())
    }

    /// Attach a volume; returns false if it was already attached
    pub fn volume_add(&mut self, volume_id: impl Into<String>) -> bool {
        self.volumes.insert(volume_id.into())
    }

    /// Detach a volume
    pub fn volume_delete(&mut self, volume_id: &str) -> Result<()> {
        if !self.volumes.remove(volume_id) {
            return Err(Error::not_found("Volume", volume_id));
        }
        Ok(())
    }
}
