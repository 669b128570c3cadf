use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use ringlet_codec::content::{
    AttachReqAns, FetchAnswer, FetchRequest, IceCandidate, PingAnswer, PingRequest, ProbeAnswer,
    ProbeInformation, ProbeInformationType, ProbeRequest, StatAnswer, StoreAnswer, StoreRequest,
};
use ringlet_codec::storage::{
    DataKind, DataValue, KindRegistry, StoreKindData, StoredData, StoredDataSpecifier,
};
use ringlet_codec::{Content, DecodeContext, ErrorCode, ErrorContent, Header, Message, WireDecode};
use ringlet_core::{NodeId, ResourceId, RoutableId};
use ringlet_crypto::{Ed25519Verifier, Verifier};
use ringlet_transport::{Connection, ConnectionTable, Connector, TransportEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::error::NodeError;
use crate::identity::LocalIdentity;
use crate::keystore::Keystore;
use crate::message::{verify_message, MessageBuilder};
use crate::router::PendingRequests;
use crate::storage::{LocalStore, ReplicaStore, StorageService};
use crate::topology::Topology;

/// Message counters of a running node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Frames handed over by the transport.
    pub inbound_messages: usize,
    /// Frames dropped because they did not decode.
    pub malformed_messages: usize,
    /// Requests handled locally, including the ones answered with an error.
    pub handled_requests: usize,
    /// Answers matched to a waiting request.
    pub matched_answers: usize,
    /// Messages relayed toward another peer.
    pub forwarded_messages: usize,
    /// Inbound messages answered with an error before reaching a handler.
    pub rejected_messages: usize,
}

#[derive(Debug, Default)]
struct Counters {
    inbound: AtomicUsize,
    malformed: AtomicUsize,
    handled: AtomicUsize,
    matched: AtomicUsize,
    forwarded: AtomicUsize,
    rejected: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub(crate) struct Inner<C> {
    pub(crate) config: OverlayConfig,
    pub(crate) overlay: u32,
    kinds: Arc<KindRegistry>,
    keystore: Arc<dyn Keystore>,
    verifier: Arc<dyn Verifier>,
    pub(crate) builder: MessageBuilder,
    pub(crate) topology: Topology,
    storage: StorageService,
    pub(crate) connections: ConnectionTable,
    pending: PendingRequests,
    pub(crate) connector: C,
    started: Instant,
    counters: Counters,
}

/// One peer of the overlay.
///
/// Cheap to clone; every clone drives the same node.
pub struct OverlayNode<C: Connector> {
    pub(crate) inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for OverlayNode<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> OverlayNode<C> {
    pub fn new(
        config: OverlayConfig,
        identity: LocalIdentity,
        kinds: Arc<KindRegistry>,
        keystore: Arc<dyn Keystore>,
        connector: C,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        if identity.node_id().len() != config.node_id_length {
            return Err(NodeError::Config(format!(
                "local node id has {} bytes, overlay uses {}",
                identity.node_id().len(),
                config.node_id_length
            )));
        }
        let overlay = config.overlay_hash();
        let verifier: Arc<dyn Verifier> = Arc::new(Ed25519Verifier);
        let topology = Topology::new(
            identity.node_id().clone(),
            config.is_overlay_initiator,
            config.replicas,
        );
        let storage = StorageService::new(
            Arc::clone(&keystore),
            Arc::clone(&verifier),
            config.resource_id_length,
            config.hash_algorithm,
        );
        let builder = MessageBuilder::new(overlay, config.initial_ttl, identity);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                overlay,
                kinds,
                keystore,
                verifier,
                builder,
                topology,
                storage,
                connections: ConnectionTable::new(),
                pending: PendingRequests::new(),
                connector,
                started: Instant::now(),
                counters: Counters::default(),
            }),
        })
    }

    pub fn local_id(&self) -> &NodeId {
        self.inner.builder.local_id()
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    pub fn identity(&self) -> &LocalIdentity {
        self.inner.builder.identity()
    }

    pub fn topology(&self) -> &Topology {
        &self.inner.topology
    }

    pub fn local_store(&self) -> &LocalStore {
        self.inner.storage.local_store()
    }

    pub fn connections(&self) -> &ConnectionTable {
        &self.inner.connections
    }

    pub fn stats(&self) -> RuntimeStats {
        let c = &self.inner.counters;
        RuntimeStats {
            inbound_messages: c.inbound.load(Ordering::Relaxed),
            malformed_messages: c.malformed.load(Ordering::Relaxed),
            handled_requests: c.handled.load(Ordering::Relaxed),
            matched_answers: c.matched.load(Ordering::Relaxed),
            forwarded_messages: c.forwarded.load(Ordering::Relaxed),
            rejected_messages: c.rejected.load(Ordering::Relaxed),
        }
    }

    /// Drives the node from its transport events until the stream ends.
    pub fn spawn(&self, mut events: UnboundedReceiver<TransportEvent>) -> JoinHandle<()> {
        let node = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                node.on_event(event);
            }
            debug!("{}: transport event stream ended", node.local_id());
        })
    }

    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(connection) => {
                debug!(
                    "{}: inbound link from {} over {}",
                    self.local_id(),
                    connection.remote(),
                    connection.link_type()
                );
                self.inner.connections.insert(connection);
            }
            TransportEvent::Received { from, bytes } => self.on_frame(from, bytes),
            TransportEvent::Closed { remote } => {
                if self.inner.connections.prune(&remote) {
                    info!("{}: lost connection to {remote}", self.local_id());
                    self.inner.topology.connection_closed(&remote);
                }
            }
        }
    }

    fn decode_context(&self) -> DecodeContext<'_> {
        let config = &self.inner.config;
        DecodeContext::new(config.node_id_length, &self.inner.kinds)
            .with_resource_id_length(config.resource_id_length)
    }

    fn on_frame(&self, from: NodeId, bytes: Bytes) {
        bump(&self.inner.counters.inbound);
        let frame_len = bytes.len();
        let mut message = match Message::decode(bytes, &self.decode_context()) {
            Ok(message) => message,
            Err(err) => {
                bump(&self.inner.counters.malformed);
                warn!("{}: dropping undecodable frame from {from}: {err}", self.local_id());
                return;
            }
        };
        message.header.previous_hop = Some(from);
        if let Err(err) = self.admit(&message.header, frame_len) {
            bump(&self.inner.counters.rejected);
            self.reject(&message, err);
            return;
        }
        if let Err(err) = self.route(message.clone()) {
            bump(&self.inner.counters.rejected);
            self.reject(&message, err);
        }
    }

    fn admit(&self, header: &Header, frame_len: usize) -> Result<(), NodeError> {
        if frame_len > self.inner.config.max_message_size {
            return Err(NodeError::MessageTooLarge(frame_len));
        }
        if header.overlay != self.inner.overlay {
            return Err(NodeError::IncompatibleOverlay(header.overlay));
        }
        if let Some(option) = header.forwarding_options.iter().find(|o| o.is_critical()) {
            return Err(NodeError::UnsupportedForwardingOption(option.option_type));
        }
        Ok(())
    }

    /// Answers a failed request with an error; failed answers are dropped.
    fn reject(&self, message: &Message, err: NodeError) {
        if message.is_answer() {
            warn!(
                "{}: dropping answer {:#x}: {err}",
                self.local_id(),
                message.header.transaction_id
            );
            return;
        }
        debug!(
            "{}: rejecting {:?} {:#x}: {err}",
            self.local_id(),
            message.content.content_type(),
            message.header.transaction_id
        );
        self.send_answer(message, Content::Error(err.to_error_content()));
    }

    fn is_local_destination(&self, destination: &RoutableId) -> bool {
        match destination {
            RoutableId::Node(id) => id == self.local_id() || id.is_wildcard(),
            RoutableId::Resource(_) => self.inner.topology.is_local_peer_responsible(destination),
            RoutableId::Opaque(_) => false,
        }
    }

    /// Pops local destinations, then delivers, forwards or sends `message`.
    fn route(&self, mut message: Message) -> Result<(), NodeError> {
        let destinations = &mut message.header.destination_list;
        let local = destinations
            .iter()
            .take_while(|d| self.is_local_destination(d))
            .count();
        destinations.drain(..local);
        if destinations.is_empty() {
            self.deliver(message);
            return Ok(());
        }
        match message.header.previous_hop.take() {
            Some(previous) => {
                if message.header.ttl == 0 {
                    return Err(NodeError::TtlExceeded);
                }
                message.header.ttl -= 1;
                message.header.via_list.push(RoutableId::Node(previous));
                self.transmit(&message)?;
                bump(&self.inner.counters.forwarded);
                Ok(())
            }
            None => self.transmit(&message),
        }
    }

    fn transmit(&self, message: &Message) -> Result<(), NodeError> {
        let bytes = message.encode()?;
        if bytes.len() > self.inner.config.max_message_size {
            return Err(NodeError::MessageTooLarge(bytes.len()));
        }
        let connection = self.next_connection(&message.header)?;
        debug!(
            "{}: sending {:?} {:#x} to {}",
            self.local_id(),
            message.content.content_type(),
            message.header.transaction_id,
            connection.remote()
        );
        connection.send(bytes)?;
        Ok(())
    }

    fn next_connection(&self, header: &Header) -> Result<Connection, NodeError> {
        let connections = &self.inner.connections;
        if let Some(next) = &header.next_hop {
            return connections
                .get(next)
                .ok_or_else(|| NodeError::Network(format!("no connection to next hop {next}")));
        }
        let destination = header
            .destination_list
            .first()
            .ok_or_else(|| NodeError::Network("message has no destination".into()))?;
        if let Some(connection) = destination.as_node().and_then(|node| connections.get(node)) {
            return Ok(connection);
        }
        self.inner
            .topology
            .next_hops(destination)
            .iter()
            .find_map(|hop| connections.get(hop))
            .ok_or_else(|| NodeError::Network(format!("no route to {destination}")))
    }

    fn deliver(&self, message: Message) {
        if message.is_answer() {
            if let Content::Error(error) = &message.content {
                debug!(
                    "{}: error {} answer to {:#x}",
                    self.local_id(),
                    error.code.code(),
                    message.header.transaction_id
                );
            }
            if self.inner.pending.complete(message) {
                bump(&self.inner.counters.matched);
            }
            return;
        }

        bump(&self.inner.counters.handled);
        if self.inner.config.verify_message_signatures {
            if let Err(err) =
                verify_message(&message, self.inner.keystore.as_ref(), self.inner.verifier.as_ref())
            {
                warn!(
                    "{}: unverified request from {}: {err}",
                    self.local_id(),
                    message.header.sender
                );
                self.reject(&message, err);
                return;
            }
        }

        let mut replicas = Vec::new();
        let content = match self.handle_request(&message, &mut replicas) {
            Ok(content) => content,
            Err(err) => {
                debug!(
                    "{}: {:?} {:#x} failed: {err}",
                    self.local_id(),
                    message.content.content_type(),
                    message.header.transaction_id
                );
                Content::Error(err.to_error_content())
            }
        };
        self.send_answer(&message, content);
        for replica in replicas {
            self.send_replica(replica);
        }
    }

    fn handle_request(
        &self,
        message: &Message,
        replicas: &mut Vec<ReplicaStore>,
    ) -> Result<Content, NodeError> {
        let inner = &self.inner;
        let header = &message.header;
        Ok(match &message.content {
            Content::PingRequest(_) => Content::PingAnswer(PingAnswer {
                response_id: rand::random(),
                time: now_millis(),
            }),
            Content::ProbeRequest(request) => Content::ProbeAnswer(self.probe_information(request)),
            Content::AttachRequest(_) => Content::AttachAnswer(self.local_attach()),
            Content::JoinRequest(request) => {
                Content::JoinAnswer(inner.topology.handle_join(request)?)
            }
            Content::LeaveRequest(request) => Content::LeaveAnswer(inner.topology.handle_leave(
                request,
                &header.sender,
                header.previous_hop.as_ref(),
            )?),
            Content::StoreRequest(request) => Content::StoreAnswer(inner.storage.handle_store(
                request,
                &message.security_block.signature.identity,
                &inner.topology,
                replicas,
            )?),
            Content::FetchRequest(request) => {
                Content::FetchAnswer(inner.storage.handle_fetch(request))
            }
            Content::StatRequest(request) => {
                Content::StatAnswer(inner.storage.handle_stat(request))
            }
            other => return Err(NodeError::UnexpectedAnswer(other.content_type())),
        })
    }

    fn probe_information(&self, request: &ProbeRequest) -> ProbeAnswer {
        let information = request
            .requested
            .iter()
            .map(|requested| match requested {
                ProbeInformationType::ResponsibleSet => {
                    let share = u32::MAX / (self.inner.topology.neighbors().len() as u32 + 1);
                    ProbeInformation::ResponsibleSet(share)
                }
                ProbeInformationType::NumResources => {
                    let size = self.inner.storage.local_store().size();
                    ProbeInformation::NumResources(u32::try_from(size).unwrap_or(u32::MAX))
                }
                ProbeInformationType::Uptime => {
                    let uptime = self.inner.started.elapsed().as_secs();
                    ProbeInformation::Uptime(u32::try_from(uptime).unwrap_or(u32::MAX))
                }
            })
            .collect();
        ProbeAnswer { information }
    }

    /// Host candidates for every configured link type at the local address.
    pub(crate) fn local_attach(&self) -> AttachReqAns {
        let config = &self.inner.config;
        AttachReqAns {
            ufrag: Bytes::from(hex::encode(rand::random::<[u8; 4]>())),
            password: Bytes::from(hex::encode(rand::random::<[u8; 12]>())),
            role: Bytes::from_static(b"passive"),
            candidates: config
                .link_types
                .iter()
                .map(|link| IceCandidate::host(config.local_address, *link))
                .collect(),
            send_update: false,
        }
    }

    fn send_answer(&self, request: &Message, content: Content) {
        let result = self
            .inner
            .builder
            .answer(request, content)
            .and_then(|answer| self.route(answer));
        if let Err(err) = result {
            warn!(
                "{}: cannot answer {:#x}: {err}",
                self.local_id(),
                request.header.transaction_id
            );
        }
    }

    /// Sends a replica store without waiting for its answer.
    fn send_replica(&self, replica: ReplicaStore) {
        let target = replica.target.clone();
        let result = self
            .inner
            .builder
            .request(
                vec![RoutableId::Node(replica.target)],
                Content::StoreRequest(replica.request),
            )
            .and_then(|message| self.route(message));
        match result {
            Ok(()) => debug!("{}: replicating to {target}", self.local_id()),
            Err(err) => warn!("{}: replica store to {target} failed: {err}", self.local_id()),
        }
    }

    /// Sends a request and waits for the matching answer.
    ///
    /// Error answers come back as [`NodeError::Remote`], or as
    /// [`NodeError::GenerationTooLow`] for generation conflicts.
    pub async fn request(
        &self,
        destinations: Vec<RoutableId>,
        content: Content,
    ) -> Result<Message, NodeError> {
        let inner = &self.inner;
        let message = inner.builder.request(destinations, content)?;
        let transaction_id = message.header.transaction_id;
        let answer = inner.pending.register(transaction_id);
        if let Err(err) = self.route(message) {
            inner.pending.cancel(transaction_id);
            return Err(err);
        }
        let answer = match tokio::time::timeout(inner.config.request_timeout, answer).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(_)) => return Err(NodeError::Network("request was dropped".into())),
            Err(_) => {
                inner.pending.cancel(transaction_id);
                return Err(NodeError::Timeout);
            }
        };
        match answer.content {
            Content::Error(error) => Err(self.remote_error(error)),
            _ => Ok(answer),
        }
    }

    fn remote_error(&self, error: ErrorContent) -> NodeError {
        if error.code == ErrorCode::GenerationCounterTooLow {
            let mut info = error.info.clone();
            if let Ok(answer) = StoreAnswer::decode(&mut info, &self.decode_context()) {
                return NodeError::GenerationTooLow(answer.responses);
            }
        }
        NodeError::Remote {
            code: error.code,
            info: error.info,
        }
    }

    pub async fn ping(&self, destination: RoutableId) -> Result<PingAnswer, NodeError> {
        let answer = self
            .request(vec![destination], Content::PingRequest(PingRequest::default()))
            .await?;
        match answer.content {
            Content::PingAnswer(ping) => Ok(ping),
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    pub async fn probe(
        &self,
        destination: NodeId,
        requested: Vec<ProbeInformationType>,
    ) -> Result<ProbeAnswer, NodeError> {
        let answer = self
            .request(
                vec![RoutableId::Node(destination)],
                Content::ProbeRequest(ProbeRequest { requested }),
            )
            .await?;
        match answer.content {
            Content::ProbeAnswer(probe) => Ok(probe),
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    /// Value of `kind` at `resource`, signed by this node.
    pub fn signed_value(
        &self,
        resource: &ResourceId,
        kind: &DataKind,
        generation: u64,
        lifetime: u32,
        value: DataValue,
    ) -> Result<StoredData, NodeError> {
        StorageService::sign_value(self.identity(), resource, kind, generation, lifetime, value)
    }

    /// Stores `kind_data` at the peer responsible for `resource`.
    pub async fn store(
        &self,
        resource: ResourceId,
        kind_data: Vec<StoreKindData>,
    ) -> Result<StoreAnswer, NodeError> {
        let request = StoreRequest {
            resource: resource.clone(),
            replica_number: 0,
            kind_data,
        };
        let answer = self
            .request(vec![RoutableId::Resource(resource)], Content::StoreRequest(request))
            .await?;
        match answer.content {
            Content::StoreAnswer(store) => Ok(store),
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    pub async fn fetch(
        &self,
        resource: ResourceId,
        specifiers: Vec<StoredDataSpecifier>,
    ) -> Result<FetchAnswer, NodeError> {
        let request = FetchRequest {
            resource: resource.clone(),
            specifiers,
        };
        let answer = self
            .request(vec![RoutableId::Resource(resource)], Content::FetchRequest(request))
            .await?;
        match answer.content {
            Content::FetchAnswer(fetch) => Ok(fetch),
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    pub async fn stat(
        &self,
        resource: ResourceId,
        specifiers: Vec<StoredDataSpecifier>,
    ) -> Result<StatAnswer, NodeError> {
        let request = FetchRequest {
            resource: resource.clone(),
            specifiers,
        };
        let answer = self
            .request(vec![RoutableId::Resource(resource)], Content::StatRequest(request))
            .await?;
        match answer.content {
            Content::StatAnswer(stat) => Ok(stat),
            other => Err(NodeError::UnexpectedAnswer(other.content_type())),
        }
    }

    /// Closes every connection; peers see the links drop.
    pub fn shutdown(&self) {
        info!("{}: shutting down", self.local_id());
        self.inner.connections.close_all();
        self.inner.topology.set_joined(false);
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
