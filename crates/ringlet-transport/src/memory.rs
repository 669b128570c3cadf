//! In-process network for tests and simulations.
//!
//! Every bound endpoint owns an unbounded event queue. Connecting pairs two
//! sinks that push frames straight into the opposite queue.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use ringlet_core::{NodeId, OverlayLinkType};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::connection::{Connection, Connector, FrameSink, TransportEvent};
use crate::error::TransportError;

#[derive(Debug, Clone)]
struct Endpoint {
    node_id: NodeId,
    link_types: Vec<OverlayLinkType>,
    events: UnboundedSender<TransportEvent>,
}

/// Registry of bound in-memory endpoints, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    endpoints: Arc<Mutex<HashMap<SocketAddr, Endpoint>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `address` for `node_id`, returning its connector and event queue.
    pub fn bind(
        &self,
        address: SocketAddr,
        node_id: NodeId,
        link_types: Vec<OverlayLinkType>,
    ) -> Result<(MemoryConnector, UnboundedReceiver<TransportEvent>), TransportError> {
        let mut endpoints = self.endpoints.lock();
        if endpoints.contains_key(&address) {
            return Err(TransportError::AddressInUse(address));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        endpoints.insert(
            address,
            Endpoint {
                node_id: node_id.clone(),
                link_types,
                events: tx.clone(),
            },
        );
        let connector = MemoryConnector {
            network: self.clone(),
            local_id: node_id,
            local_address: address,
            events: tx,
        };
        Ok((connector, rx))
    }

    /// Stops accepting connections at `address`; open links stay up.
    pub fn unbind(&self, address: &SocketAddr) {
        self.endpoints.lock().remove(address);
    }

    fn endpoint(&self, address: &SocketAddr) -> Option<Endpoint> {
        self.endpoints.lock().get(address).cloned()
    }
}

#[derive(Debug)]
struct MemorySink {
    local: NodeId,
    remote: NodeId,
    local_events: UnboundedSender<TransportEvent>,
    remote_events: UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl FrameSink for MemorySink {
    fn send_frame(&self, bytes: Bytes) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.remote_events
            .send(TransportEvent::Received {
                from: self.local.clone(),
                bytes,
            })
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.remote_events.send(TransportEvent::Closed {
            remote: self.local.clone(),
        });
        let _ = self.local_events.send(TransportEvent::Closed {
            remote: self.remote.clone(),
        });
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Connector for one bound in-memory endpoint.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    network: MemoryNetwork,
    local_id: NodeId,
    local_address: SocketAddr,
    events: UnboundedSender<TransportEvent>,
}

impl MemoryConnector {
    pub fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    fn open(
        &self,
        address: SocketAddr,
        link_type: OverlayLinkType,
    ) -> Result<Connection, TransportError> {
        let endpoint = self
            .network
            .endpoint(&address)
            .ok_or(TransportError::Unreachable(address))?;
        if !endpoint.link_types.contains(&link_type) {
            return Err(TransportError::UnsupportedLink {
                address,
                link: link_type,
            });
        }
        let closed = Arc::new(AtomicBool::new(false));
        let outbound = MemorySink {
            local: self.local_id.clone(),
            remote: endpoint.node_id.clone(),
            local_events: self.events.clone(),
            remote_events: endpoint.events.clone(),
            closed: Arc::clone(&closed),
        };
        let inbound = MemorySink {
            local: endpoint.node_id.clone(),
            remote: self.local_id.clone(),
            local_events: endpoint.events.clone(),
            remote_events: self.events.clone(),
            closed,
        };
        endpoint
            .events
            .send(TransportEvent::Connected(Connection::new(
                self.local_id.clone(),
                self.local_address,
                link_type,
                Arc::new(inbound),
            )))
            .map_err(|_| TransportError::Unreachable(address))?;
        debug!("memory link {} -> {} over {link_type}", self.local_id, endpoint.node_id);
        Ok(Connection::new(
            endpoint.node_id,
            address,
            link_type,
            Arc::new(outbound),
        ))
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        address: SocketAddr,
        link_type: OverlayLinkType,
    ) -> impl Future<Output = Result<Connection, TransportError>> + Send {
        let result = self.open(address, link_type);
        async move { result }
    }
}
