use ringlet_core::{HashAlgorithm, NodeId};

/// Prefix of the self-issued certificate encoding.
const CERT_MAGIC: &[u8] = b"ringlet-cert-v1";

/// A peer certificate as resolved by the keystore: the identities it binds
/// and the raw bytes those identities are hashed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayCertificate {
    pub node_id: NodeId,
    pub user_name: String,
    pub public_key: [u8; 32],
    /// The certificate exactly as carried in security blocks.
    pub encoded: Vec<u8>,
}

impl OverlayCertificate {
    /// Builds a certificate whose encoding is derived from its fields.
    ///
    /// Enrollment-issued certificates arrive already encoded; this form
    /// serves overlays without an enrollment server.
    pub fn self_issued(
        node_id: NodeId,
        user_name: impl Into<String>,
        public_key: [u8; 32],
    ) -> Self {
        let user_name = user_name.into();
        let mut encoded =
            Vec::with_capacity(CERT_MAGIC.len() + 2 + node_id.len() + user_name.len() + 32);
        encoded.extend_from_slice(CERT_MAGIC);
        encoded.push(node_id.len() as u8);
        encoded.extend_from_slice(node_id.as_bytes());
        encoded.push(user_name.len().min(u8::MAX as usize) as u8);
        encoded.extend_from_slice(&user_name.as_bytes()[..user_name.len().min(u8::MAX as usize)]);
        encoded.extend_from_slice(&public_key);
        Self {
            node_id,
            user_name,
            public_key,
            encoded,
        }
    }

    pub fn cert_hash(&self, alg: HashAlgorithm) -> Vec<u8> {
        cert_hash(alg, &self.encoded)
    }

    pub fn cert_hash_node_id(&self, alg: HashAlgorithm) -> Vec<u8> {
        cert_hash_node_id(alg, &self.encoded, &self.node_id)
    }
}

/// Identity hash over a certificate.
pub fn cert_hash(alg: HashAlgorithm, cert: &[u8]) -> Vec<u8> {
    alg.digest(cert)
}

/// Identity hash over a certificate followed by the node id it signs for.
pub fn cert_hash_node_id(alg: HashAlgorithm, cert: &[u8], node_id: &NodeId) -> Vec<u8> {
    alg.digest_parts(&[cert, node_id.as_bytes()])
}
