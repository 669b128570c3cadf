//! Ring topology: who the neighbors are, which one is closest to a
//! destination, and whether the local node answers for it.

mod membership;
mod routing;

pub use routing::closer_id;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use ringlet_core::NodeId;
use tracing::info;

/// Routing table of one overlay node.
#[derive(Debug)]
pub struct Topology {
    local_id: NodeId,
    initiator: bool,
    replicas: usize,
    joined: AtomicBool,
    neighbors: RwLock<BTreeSet<NodeId>>,
}

impl Topology {
    pub fn new(local_id: NodeId, initiator: bool, replicas: usize) -> Self {
        Self {
            local_id,
            initiator,
            replicas,
            joined: AtomicBool::new(false),
            neighbors: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    pub fn set_joined(&self, joined: bool) {
        self.joined.store(joined, Ordering::SeqCst);
    }

    /// Ordered snapshot of the neighbor set.
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.neighbors.read().iter().cloned().collect()
    }

    pub fn contains_neighbor(&self, id: &NodeId) -> bool {
        self.neighbors.read().contains(id)
    }

    pub fn add_neighbor(&self, id: NodeId) -> bool {
        if id == self.local_id {
            return false;
        }
        let added = self.neighbors.write().insert(id.clone());
        if added {
            info!("neighbor {id} added");
        }
        added
    }

    pub fn remove_neighbor(&self, id: &NodeId) -> bool {
        let removed = self.neighbors.write().remove(id);
        if removed {
            info!("neighbor {id} removed");
        }
        removed
    }

    /// The transport lost its last link to `remote`.
    pub fn connection_closed(&self, remote: &NodeId) {
        self.remove_neighbor(remote);
    }
}
