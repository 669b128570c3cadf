use ringlet_codec::content::{JoinAnswer, JoinRequest, LeaveAnswer, LeaveRequest};
use ringlet_core::NodeId;
use tracing::warn;

use super::Topology;
use crate::error::NodeError;

impl Topology {
    /// Admits `request.joining_node` as a neighbor.
    pub fn handle_join(&self, request: &JoinRequest) -> Result<JoinAnswer, NodeError> {
        if !(self.is_joined() || self.is_initiator()) {
            return Err(NodeError::Forbidden("admitting peer has not joined".into()));
        }
        self.add_neighbor(request.joining_node.clone());
        Ok(JoinAnswer::default())
    }

    /// Removes the leaving node, provided it is the one asking.
    ///
    /// Both the header sender and the hop the request arrived from must be
    /// the leaving node, so a third party cannot evict a neighbor.
    pub fn handle_leave(
        &self,
        request: &LeaveRequest,
        sender: &NodeId,
        previous_hop: Option<&NodeId>,
    ) -> Result<LeaveAnswer, NodeError> {
        let leaving = &request.leaving_node;
        if sender != leaving || previous_hop != Some(leaving) {
            warn!("rejecting leave of {leaving} requested by {sender}");
            return Err(NodeError::Forbidden(format!(
                "leave for {leaving} not sent by that node"
            )));
        }
        self.remove_neighbor(leaving);
        Ok(LeaveAnswer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn node(byte: u8) -> NodeId {
        NodeId::new(vec![byte; 8]).unwrap()
    }

    fn leave(byte: u8) -> LeaveRequest {
        LeaveRequest {
            leaving_node: node(byte),
            overlay_data: Bytes::new(),
        }
    }

    #[test]
    fn join_adds_the_joining_node() {
        let topology = Topology::new(node(1), true, 1);
        let request = JoinRequest {
            joining_node: node(2),
            overlay_data: Bytes::new(),
        };
        topology.handle_join(&request).unwrap();
        assert_eq!(topology.neighbors(), vec![node(2)]);
    }

    #[test]
    fn join_needs_an_admitting_peer_inside_the_overlay() {
        let topology = Topology::new(node(1), false, 1);
        let request = JoinRequest {
            joining_node: node(2),
            overlay_data: Bytes::new(),
        };
        assert!(matches!(
            topology.handle_join(&request),
            Err(NodeError::Forbidden(_))
        ));
        assert!(topology.neighbors().is_empty());
    }

    #[test]
    fn leave_from_the_leaving_node_is_accepted() {
        let topology = Topology::new(node(1), true, 1);
        topology.add_neighbor(node(2));
        topology
            .handle_leave(&leave(2), &node(2), Some(&node(2)))
            .unwrap();
        assert!(topology.neighbors().is_empty());
    }

    #[test]
    fn leave_with_a_foreign_sender_or_hop_is_forbidden() {
        let topology = Topology::new(node(1), true, 1);
        topology.add_neighbor(node(2));
        topology.add_neighbor(node(3));

        for (sender, hop) in [
            (node(3), Some(node(2))),
            (node(2), Some(node(3))),
            (node(2), None),
        ] {
            let result = topology.handle_leave(&leave(2), &sender, hop.as_ref());
            assert!(matches!(result, Err(NodeError::Forbidden(_))));
        }
        assert_eq!(topology.neighbors(), vec![node(2), node(3)]);
    }
}
