use bytes::Bytes;
use parking_lot::RwLock;
use ringlet_codec::SignerIdentity;
use ringlet_core::HashAlgorithm;
use ringlet_crypto::OverlayCertificate;

/// Hash algorithm and digest of an identity that names a single certificate.
///
/// `none` identities, the `none` hash algorithm and digests of the wrong
/// width name nothing.
pub fn bound_digest(identity: &SignerIdentity) -> Option<(HashAlgorithm, &Bytes)> {
    let (hash_algorithm, hash) = match identity {
        SignerIdentity::CertHash {
            hash_algorithm,
            hash,
        }
        | SignerIdentity::CertHashNodeId {
            hash_algorithm,
            hash,
        } => (*hash_algorithm, hash),
        SignerIdentity::None => return None,
    };
    let width = hash_algorithm.output_len();
    (width > 0 && hash.len() == width).then_some((hash_algorithm, hash))
}

/// Certificate lookup by signer identity.
pub trait Keystore: Send + Sync {
    /// Certificate whose identity hash equals the one carried in `identity`.
    fn certificate(&self, identity: &SignerIdentity) -> Option<OverlayCertificate>;
}

/// Keystore holding enrolled certificates in memory.
#[derive(Debug, Default)]
pub struct MemoryKeystore {
    certificates: RwLock<Vec<OverlayCertificate>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `certificate`, replacing an earlier one for the same node.
    pub fn add(&self, certificate: OverlayCertificate) {
        let mut certificates = self.certificates.write();
        certificates.retain(|c| c.encoded != certificate.encoded);
        certificates.push(certificate);
    }

    pub fn len(&self) -> usize {
        self.certificates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.read().is_empty()
    }
}

impl Keystore for MemoryKeystore {
    fn certificate(&self, identity: &SignerIdentity) -> Option<OverlayCertificate> {
        let (hash_algorithm, hash) = bound_digest(identity)?;
        let certificates = self.certificates.read();
        let found = match identity {
            SignerIdentity::CertHash { .. } => certificates
                .iter()
                .find(|c| c.cert_hash(hash_algorithm).as_slice() == &hash[..]),
            SignerIdentity::CertHashNodeId { .. } => certificates
                .iter()
                .find(|c| c.cert_hash_node_id(hash_algorithm).as_slice() == &hash[..]),
            SignerIdentity::None => None,
        };
        found.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlet_core::NodeId;

    fn cert(byte: u8) -> OverlayCertificate {
        OverlayCertificate::self_issued(NodeId::new(vec![byte; 16]).unwrap(), "carol", [byte; 32])
    }

    #[test]
    fn lookup_matches_the_identity_flavour() {
        let keystore = MemoryKeystore::new();
        keystore.add(cert(1));
        keystore.add(cert(2));
        let target = cert(2);
        let alg = HashAlgorithm::Sha256;

        let by_node = SignerIdentity::CertHashNodeId {
            hash_algorithm: alg,
            hash: Bytes::from(target.cert_hash_node_id(alg)),
        };
        assert_eq!(keystore.certificate(&by_node), Some(target.clone()));

        let by_cert = SignerIdentity::CertHash {
            hash_algorithm: alg,
            hash: Bytes::from(target.cert_hash(alg)),
        };
        assert_eq!(keystore.certificate(&by_cert), Some(target.clone()));

        // a plain certificate hash presented as a node-bound one
        let confused = SignerIdentity::CertHashNodeId {
            hash_algorithm: alg,
            hash: Bytes::from(target.cert_hash(alg)),
        };
        assert_eq!(keystore.certificate(&confused), None);
        assert_eq!(keystore.certificate(&SignerIdentity::None), None);
    }

    #[test]
    fn empty_digests_resolve_to_nothing() {
        let keystore = MemoryKeystore::new();
        keystore.add(cert(1));
        keystore.add(cert(2));
        for identity in [
            SignerIdentity::CertHashNodeId {
                hash_algorithm: HashAlgorithm::None,
                hash: Bytes::new(),
            },
            SignerIdentity::CertHash {
                hash_algorithm: HashAlgorithm::None,
                hash: Bytes::new(),
            },
            SignerIdentity::CertHashNodeId {
                hash_algorithm: HashAlgorithm::Sha256,
                hash: Bytes::from(cert(1).cert_hash_node_id(HashAlgorithm::Sha256)[..8].to_vec()),
            },
        ] {
            assert_eq!(bound_digest(&identity), None);
            assert_eq!(keystore.certificate(&identity), None);
        }
    }

    #[test]
    fn re_adding_a_certificate_does_not_duplicate_it() {
        let keystore = MemoryKeystore::new();
        keystore.add(cert(1));
        keystore.add(cert(1));
        assert_eq!(keystore.len(), 1);
    }
}
