use ringlet_codec::{Content, Header, Message, SecurityBlock, SignatureAlgorithm};
use ringlet_core::{NodeId, RoutableId};
use ringlet_crypto::Verifier;

use crate::error::NodeError;
use crate::identity::LocalIdentity;
use crate::keystore::{bound_digest, Keystore};

/// Builds the signed requests and answers a node sends.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    overlay: u32,
    initial_ttl: u8,
    identity: LocalIdentity,
}

impl MessageBuilder {
    pub fn new(overlay: u32, initial_ttl: u8, identity: LocalIdentity) -> Self {
        Self {
            overlay,
            initial_ttl,
            identity,
        }
    }

    pub fn local_id(&self) -> &NodeId {
        self.identity.node_id()
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// New request under a fresh random transaction id.
    pub fn request(
        &self,
        destinations: Vec<RoutableId>,
        content: Content,
    ) -> Result<Message, NodeError> {
        let transaction_id = rand::random::<u64>();
        let mut header = Header::new(
            self.overlay,
            transaction_id,
            self.local_id().clone(),
            destinations,
        );
        header.ttl = self.initial_ttl;
        let security_block = self.sign(transaction_id, &content)?;
        Ok(Message {
            header,
            content,
            security_block,
        })
    }

    /// Answer to `request`, routed back along the path it came in on.
    pub fn answer(&self, request: &Message, content: Content) -> Result<Message, NodeError> {
        let transaction_id = request.header.transaction_id;
        let mut header = Header::new(
            self.overlay,
            transaction_id,
            self.local_id().clone(),
            return_path(request),
        );
        header.ttl = self.initial_ttl;
        let security_block = self.sign(transaction_id, &content)?;
        Ok(Message {
            header,
            content,
            security_block,
        })
    }

    fn sign(&self, transaction_id: u64, content: &Content) -> Result<SecurityBlock, NodeError> {
        let payload = Message::signed_payload(transaction_id, content)?;
        let signature = self.identity.sign(self.identity.node_identity(), &payload)?;
        Ok(SecurityBlock {
            certificates: vec![self.identity.wire_certificate()],
            signature,
        })
    }
}

/// Previous hop first, then the recorded via list newest first.
fn return_path(request: &Message) -> Vec<RoutableId> {
    let header = &request.header;
    let mut path: Vec<RoutableId> = header
        .previous_hop
        .iter()
        .cloned()
        .map(RoutableId::Node)
        .collect();
    path.extend(header.via_list.iter().rev().cloned());
    if path.is_empty() {
        path.push(RoutableId::Node(header.sender.clone()));
    }
    path
}

/// Checks the message signature against the certificate the keystore holds
/// for its signer. The certificate must belong to the header's sender.
pub fn verify_message(
    message: &Message,
    keystore: &dyn Keystore,
    verifier: &dyn Verifier,
) -> Result<(), NodeError> {
    let signature = &message.security_block.signature;
    if bound_digest(&signature.identity).is_none() {
        return Err(NodeError::Forbidden(format!(
            "message {:#x} names no signer certificate",
            message.header.transaction_id
        )));
    }
    let certificate = keystore.certificate(&signature.identity).ok_or_else(|| {
        NodeError::Forbidden(format!(
            "signer of message {:#x} is unknown",
            message.header.transaction_id
        ))
    })?;
    if certificate.node_id != message.header.sender {
        return Err(NodeError::Forbidden(format!(
            "message {:#x} is signed for {} but sent by {}",
            message.header.transaction_id, certificate.node_id, message.header.sender
        )));
    }
    if signature.algorithm != SignatureAlgorithm::Ed25519 {
        return Err(NodeError::Signature("message is not ed25519 signed".into()));
    }
    let payload = Message::signed_payload(message.header.transaction_id, &message.content)?;
    if verifier.verify(certificate.public_key, &payload, &signature.value)? {
        Ok(())
    } else {
        Err(NodeError::Signature(format!(
            "bad signature on message {:#x}",
            message.header.transaction_id
        )))
    }
}
