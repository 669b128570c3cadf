//! Entering and leaving the overlay.
//!
//! A joining peer connects to a bootstrap peer, attaches to the peer
//! responsible for its own id through it and then sends that peer a join.

use bytes::Bytes;
use ringlet_codec::content::{AttachReqAns, JoinRequest, LeaveRequest};
use ringlet_codec::Content;
use ringlet_core::{NodeId, ResourceId, RoutableId};
use ringlet_transport::{Connection, Connector};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::NodeError;
use crate::node::OverlayNode;

impl<C: Connector> OverlayNode<C> {
    /// Connects the node to its overlay and returns the admitting peer.
    ///
    /// The initiator has nobody to join and is considered joined right away.
    /// With `join_needed` false the node attaches but stays outside the ring.
    pub async fn connect_to_overlay(&self, join_needed: bool) -> Result<Option<NodeId>, NodeError> {
        let inner = &self.inner;
        if inner.config.is_overlay_initiator {
            inner.topology.set_joined(true);
            info!("{}: initiated overlay {}", self.local_id(), inner.config.overlay_name);
            return Ok(None);
        }

        let bootstrap = self.connect_bootstrap().await?;
        let bootstrap_id = bootstrap.remote().clone();
        info!(
            "{}: bootstrap link to {bootstrap_id} at {}",
            self.local_id(),
            bootstrap.remote_address()
        );
        inner.connections.insert(bootstrap);

        let (admitting, answer) = self.attach(bootstrap_id).await?;
        if inner.connections.get(&admitting).is_none() {
            let candidate = answer.candidates.first().ok_or_else(|| {
                NodeError::Network(format!("attach answer from {admitting} has no candidate"))
            })?;
            let connection = inner
                .connector
                .connect(candidate.address, candidate.link_type)
                .await?;
            inner.connections.insert(connection);
        }

        if join_needed {
            self.request_join(&admitting).await?;
        }
        Ok(Some(admitting))
    }

    /// Races every bootstrap address over every link type; the first link
    /// up wins and the rest are closed once they complete.
    async fn connect_bootstrap(&self) -> Result<Connection, NodeError> {
        let config = &self.inner.config;
        let mut attempts = JoinSet::new();
        for &address in &config.bootstrap_addresses {
            for &link_type in &config.link_types {
                let inner = std::sync::Arc::clone(&self.inner);
                attempts.spawn(async move { inner.connector.connect(address, link_type).await });
            }
        }

        let mut failure = None;
        let mut winner = None;
        while let Some(attempt) = attempts.join_next().await {
            match attempt {
                Ok(Ok(connection)) => {
                    winner = Some(connection);
                    break;
                }
                Ok(Err(err)) => {
                    debug!("{}: bootstrap attempt failed: {err}", self.local_id());
                    failure = Some(NodeError::from(err));
                }
                Err(err) => failure = Some(NodeError::Network(err.to_string())),
            }
        }

        let Some(winner) = winner else {
            let err = failure
                .unwrap_or_else(|| NodeError::Network("no bootstrap address configured".into()));
            warn!("{}: every bootstrap attempt failed", self.local_id());
            return Err(err);
        };
        if !attempts.is_empty() {
            tokio::spawn(async move {
                while let Some(attempt) = attempts.join_next().await {
                    if let Ok(Ok(connection)) = attempt {
                        connection.close();
                    }
                }
            });
        }
        Ok(winner)
    }

    /// Attaches through `bootstrap` to the peer responsible for our id.
    async fn attach(&self, bootstrap: NodeId) -> Result<(NodeId, AttachReqAns), NodeError> {
        let destinations = vec![
            RoutableId::Node(bootstrap),
            RoutableId::Resource(ResourceId::from_node_id(self.local_id())),
        ];
        let answer = self
            .request(destinations, Content::AttachRequest(self.local_attach()))
            .await?;
        match answer.content {
            Content::AttachAnswer(attach) => Ok((answer.header.sender, attach)),
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    /// Joins through `admitting`; the node counts as joined once it answers.
    pub async fn request_join(&self, admitting: &NodeId) -> Result<NodeId, NodeError> {
        let request = JoinRequest {
            joining_node: self.local_id().clone(),
            overlay_data: Bytes::new(),
        };
        let answer = self
            .request(vec![RoutableId::Node(admitting.clone())], Content::JoinRequest(request))
            .await?;
        match answer.content {
            Content::JoinAnswer(_) => {
                let topology = &self.inner.topology;
                topology.set_joined(true);
                topology.add_neighbor(admitting.clone());
                info!("{}: joined through {admitting}", self.local_id());
                Ok(admitting.clone())
            }
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    /// Tells `neighbor` we are leaving and drops it from the neighbor set.
    pub async fn request_leave(&self, neighbor: &NodeId) -> Result<NodeId, NodeError> {
        let request = LeaveRequest {
            leaving_node: self.local_id().clone(),
            overlay_data: Bytes::new(),
        };
        let answer = self
            .request(vec![RoutableId::Node(neighbor.clone())], Content::LeaveRequest(request))
            .await?;
        match answer.content {
            Content::LeaveAnswer(_) => {
                let topology = &self.inner.topology;
                topology.remove_neighbor(neighbor);
                topology.set_joined(false);
                info!("{}: left {neighbor}", self.local_id());
                Ok(neighbor.clone())
            }
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    /// Leaves every neighbor, reporting the first failure.
    pub async fn leave_overlay(&self) -> Result<(), NodeError> {
        let mut first_error = None;
        for neighbor in self.inner.topology.neighbors() {
            if let Err(err) = self.request_leave(&neighbor).await {
                warn!("{}: leave to {neighbor} failed: {err}", self.local_id());
                first_error.get_or_insert(err);
            }
        }
        self.inner.topology.set_joined(false);
        first_error.map_or(Ok(()), Err)
    }
}
