use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use ringlet_codec::security::CertificateType;
use ringlet_codec::{GenericCertificate, Signature, SignatureAlgorithm, SignerIdentity};
use ringlet_core::{HashAlgorithm, NodeId};
use ringlet_crypto::{Ed25519Signer, OverlayCertificate, Signer};

use crate::error::NodeError;

/// The local peer's certificate and signing key.
#[derive(Clone)]
pub struct LocalIdentity {
    certificate: OverlayCertificate,
    signer: Arc<dyn Signer>,
    hash_algorithm: HashAlgorithm,
}

impl fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("node_id", &self.certificate.node_id)
            .field("user_name", &self.certificate.user_name)
            .finish_non_exhaustive()
    }
}

impl LocalIdentity {
    pub fn new(
        certificate: OverlayCertificate,
        signer: impl Signer + 'static,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self, NodeError> {
        if signer.public_key() != certificate.public_key {
            return Err(NodeError::Config(
                "signing key does not match the certificate".into(),
            ));
        }
        Ok(Self {
            certificate,
            signer: Arc::new(signer),
            hash_algorithm,
        })
    }

    /// Fresh key pair with a self-issued certificate.
    pub fn generate(node_id: NodeId, user_name: &str, hash_algorithm: HashAlgorithm) -> Self {
        let signer = Ed25519Signer::generate();
        let certificate = OverlayCertificate::self_issued(node_id, user_name, signer.public_key());
        Self {
            certificate,
            signer: Arc::new(signer),
            hash_algorithm,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.certificate.node_id
    }

    pub fn certificate(&self) -> &OverlayCertificate {
        &self.certificate
    }

    /// Identity bound to this node, used for messages and node-scoped kinds.
    pub fn node_identity(&self) -> SignerIdentity {
        SignerIdentity::CertHashNodeId {
            hash_algorithm: self.hash_algorithm,
            hash: Bytes::from(self.certificate.cert_hash_node_id(self.hash_algorithm)),
        }
    }

    /// Identity bound to the user, used for user-scoped kinds.
    pub fn user_identity(&self) -> SignerIdentity {
        SignerIdentity::CertHash {
            hash_algorithm: self.hash_algorithm,
            hash: Bytes::from(self.certificate.cert_hash(self.hash_algorithm)),
        }
    }

    pub fn wire_certificate(&self) -> GenericCertificate {
        GenericCertificate {
            cert_type: CertificateType::X509,
            der: Bytes::from(self.certificate.encoded.clone()),
        }
    }

    /// Signs `payload` as `identity`.
    pub fn sign(&self, identity: SignerIdentity, payload: &[u8]) -> Result<Signature, NodeError> {
        let value = self.signer.sign(payload)?;
        Ok(Signature {
            hash_algorithm: self.hash_algorithm,
            algorithm: SignatureAlgorithm::Ed25519,
            identity,
            value: Bytes::copy_from_slice(&value),
        })
    }
}
