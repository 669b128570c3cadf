use ringlet_core::{distance, NodeId, ResourceId, RoutableId};

use super::Topology;

/// Candidate closest to `destination`; equal distances go to the lowest id.
pub fn closer_id<'a, I>(destination: &RoutableId, candidates: I) -> Option<&'a NodeId>
where
    I: IntoIterator<Item = &'a NodeId>,
{
    candidates
        .into_iter()
        .min_by(|a, b| {
            distance(a, destination)
                .cmp(&distance(b, destination))
                .then_with(|| a.cmp(b))
        })
}

impl Topology {
    /// Neighbors to forward toward `destination`: the single closest one.
    pub fn next_hops(&self, destination: &RoutableId) -> Vec<NodeId> {
        let neighbors = self.neighbors.read();
        closer_id(destination, neighbors.iter())
            .cloned()
            .into_iter()
            .collect()
    }

    /// True when no neighbor is strictly closer to `destination` than we are.
    ///
    /// A node that has neither joined nor started the overlay answers for
    /// nothing.
    pub fn is_local_peer_responsible(&self, destination: &RoutableId) -> bool {
        if !(self.is_joined() || self.initiator) {
            return false;
        }
        let local = distance(&self.local_id, destination);
        !self
            .neighbors
            .read()
            .iter()
            .any(|n| distance(n, destination) < local)
    }

    /// The configured number of neighbors closest to `resource`.
    pub fn replica_nodes(&self, resource: &ResourceId) -> Vec<NodeId> {
        let mut ranked: Vec<(u32, NodeId)> = self
            .neighbors
            .read()
            .iter()
            .map(|n| (distance(n, resource), n.clone()))
            .collect();
        ranked.sort();
        ranked
            .into_iter()
            .take(self.replicas)
            .map(|(_, id)| id)
            .collect()
    }
}
