use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use ringlet_core::{NodeId, OverlayLinkType};

use crate::error::TransportError;

/// Byte-frame sink behind a connection.
pub trait FrameSink: Send + Sync + fmt::Debug {
    /// Queues one encoded message for delivery.
    fn send_frame(&self, bytes: Bytes) -> Result<(), TransportError>;
    /// Closes the link; both ends observe a [`TransportEvent::Closed`].
    fn close(&self);
    fn is_closed(&self) -> bool;
}

/// An established link to one remote peer.
#[derive(Debug, Clone)]
pub struct Connection {
    remote: NodeId,
    remote_address: SocketAddr,
    link_type: OverlayLinkType,
    sink: Arc<dyn FrameSink>,
}

impl Connection {
    pub fn new(
        remote: NodeId,
        remote_address: SocketAddr,
        link_type: OverlayLinkType,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            remote,
            remote_address,
            link_type,
            sink,
        }
    }

    /// Node id the remote end authenticated as.
    pub fn remote(&self) -> &NodeId {
        &self.remote
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.remote_address
    }

    pub fn link_type(&self) -> OverlayLinkType {
        self.link_type
    }

    pub fn send(&self, bytes: Bytes) -> Result<(), TransportError> {
        self.sink.send_frame(bytes)
    }

    pub fn close(&self) {
        self.sink.close();
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }
}

/// Notifications delivered to the node owning a transport endpoint.
#[derive(Debug)]
pub enum TransportEvent {
    /// A remote peer opened a connection to us.
    Connected(Connection),
    Received { from: NodeId, bytes: Bytes },
    Closed { remote: NodeId },
}

/// Outbound connection establishment.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        address: SocketAddr,
        link_type: OverlayLinkType,
    ) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

/// Open connections keyed by remote node id.
///
/// A remote may hold several links at once (racing connects, both sides
/// dialing); lookups hand out the oldest one still open.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    inner: RwLock<HashMap<NodeId, Vec<Connection>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, connection: Connection) {
        let mut inner = self.inner.write();
        let links = inner.entry(connection.remote().clone()).or_default();
        links.retain(|c| !c.is_closed());
        links.push(connection);
    }

    pub fn get(&self, remote: &NodeId) -> Option<Connection> {
        self.inner
            .read()
            .get(remote)
            .and_then(|links| links.iter().find(|c| !c.is_closed()))
            .cloned()
    }

    /// Drops the closed links to `remote`; true once none remains open.
    pub fn prune(&self, remote: &NodeId) -> bool {
        let mut inner = self.inner.write();
        let Some(links) = inner.get_mut(remote) else {
            return true;
        };
        links.retain(|c| !c.is_closed());
        if links.is_empty() {
            inner.remove(remote);
            true
        } else {
            false
        }
    }

    /// Forgets every link to `remote` without closing them.
    pub fn remove(&self, remote: &NodeId) -> Vec<Connection> {
        self.inner.write().remove(remote).unwrap_or_default()
    }

    pub fn remotes(&self) -> Vec<NodeId> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Closes and forgets every connection.
    pub fn close_all(&self) {
        let drained: Vec<Connection> = self
            .inner
            .write()
            .drain()
            .flat_map(|(_, links)| links)
            .collect();
        for connection in drained {
            connection.close();
        }
    }
}
