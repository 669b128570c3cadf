use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ringlet_codec::content::PingRequest;
use ringlet_codec::storage::KindRegistry;
use ringlet_codec::Content;
use ringlet_core::{NodeId, OverlayLinkType, RoutableId};
use ringlet_node::{
    Keystore, LocalIdentity, MemoryKeystore, MessageBuilder, OverlayConfig, OverlayNode,
};
use ringlet_transport::{Connector, MemoryConnector, MemoryNetwork};

fn xorshift64(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut s = seed.max(1);
    let mut out = vec![0_u8; len];
    for b in &mut out {
        *b = (xorshift64(&mut s) & 0xFF) as u8;
    }
    out
}

fn address(byte: u8) -> SocketAddr {
    SocketAddr::from(([10, 2, 0, byte], 6084))
}

fn identity(byte: u8, config: &OverlayConfig) -> LocalIdentity {
    let id = NodeId::new(vec![byte; config.node_id_length]).expect("node id should be valid");
    LocalIdentity::generate(id, &format!("user-{byte}"), config.hash_algorithm)
}

fn target(network: &MemoryNetwork, keystore: &Arc<MemoryKeystore>) -> OverlayNode<MemoryConnector> {
    let config = OverlayConfig {
        local_address: address(1),
        is_overlay_initiator: true,
        request_timeout: Duration::from_secs(2),
        ..OverlayConfig::default()
    };
    let identity = identity(1, &config);
    keystore.add(identity.certificate().clone());
    let (connector, events) = network
        .bind(config.local_address, identity.node_id().clone(), config.link_types.clone())
        .expect("address should be free");
    let keystore: Arc<dyn Keystore> = keystore.clone();
    let kinds = Arc::new(KindRegistry::new());
    let node = OverlayNode::new(config, identity, kinds, keystore, connector)
        .expect("node should build");
    node.spawn(events);
    node
}

async fn wait_for_inbound(node: &OverlayNode<MemoryConnector>, expected: usize) -> bool {
    for _ in 0..500 {
        if node.stats().inbound_messages >= expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn fuzz_like_frame_ingest_does_not_stop_the_node() {
    let network = MemoryNetwork::new();
    let keystore = Arc::new(MemoryKeystore::new());
    let node = target(&network, &keystore);
    node.connect_to_overlay(true).await.expect("initiator starts");

    let injector_id = NodeId::new(vec![0xEE; 16]).expect("node id should be valid");
    let (injector, _injector_events) = network
        .bind(address(9), injector_id, vec![OverlayLinkType::TlsTcpFhNoIce])
        .expect("address should be free");
    let link = injector
        .connect(address(1), OverlayLinkType::TlsTcpFhNoIce)
        .await
        .expect("injector should connect");

    let mut sent = 0;
    for i in 0..1500_u64 {
        let len = ((i as usize) * 37) % 4096;
        link.send(Bytes::from(random_bytes(0xC0DEC0DE ^ i, len)))
            .expect("in-memory link should accept frames");
        sent += 1;
    }

    // flipped bytes inside a well-formed signed ping
    let config = OverlayConfig::default();
    let builder = MessageBuilder::new(
        config.overlay_hash(),
        config.initial_ttl,
        identity(0xEE, &config),
    );
    let ping = builder
        .request(
            vec![RoutableId::Node(node.local_id().clone())],
            Content::PingRequest(PingRequest::default()),
        )
        .expect("ping should build")
        .encode()
        .expect("ping should encode");
    let mut bytes = ping.to_vec();
    for i in 0..512_usize {
        let idx = i % bytes.len();
        bytes[idx] ^= (i as u8).wrapping_mul(31).wrapping_add(1);
        link.send(Bytes::from(bytes.clone()))
            .expect("in-memory link should accept frames");
        sent += 1;
    }

    assert!(wait_for_inbound(&node, sent).await, "every frame should be ingested");
    let stats = node.stats();
    assert_eq!(stats.inbound_messages, sent);
    assert!(stats.malformed_messages > 0);
    assert!(stats.malformed_messages <= stats.inbound_messages);

    let peer_config = OverlayConfig {
        local_address: address(2),
        bootstrap_addresses: vec![address(1)],
        request_timeout: Duration::from_secs(2),
        ..OverlayConfig::default()
    };
    let peer_identity = identity(2, &peer_config);
    keystore.add(peer_identity.certificate().clone());
    let (connector, events) = network
        .bind(
            peer_config.local_address,
            peer_identity.node_id().clone(),
            peer_config.link_types.clone(),
        )
        .expect("address should be free");
    let shared: Arc<dyn Keystore> = keystore.clone();
    let peer = OverlayNode::new(
        peer_config,
        peer_identity,
        Arc::new(KindRegistry::new()),
        shared,
        connector,
    )
    .expect("node should build");
    peer.spawn(events);
    peer.connect_to_overlay(true).await.expect("join after fuzzing should work");
    peer.ping(RoutableId::Node(node.local_id().clone()))
        .await
        .expect("node should still answer pings");
}
