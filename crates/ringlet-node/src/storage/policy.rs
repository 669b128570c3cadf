//! Access policies decide which signer may write a value at a resource.
//!
//! Every policy derives the resource ids a certificate may write to and
//! checks that the signer identity really belongs to that certificate.

use ringlet_codec::storage::{AccessPolicyKind, DataKind, StoredData, MAX_NODE_MULTIPLE_PARAM};
use ringlet_codec::SignerIdentity;
use ringlet_core::{HashAlgorithm, NodeId, ResourceId};
use ringlet_crypto::OverlayCertificate;

use crate::error::NodeError;
use crate::keystore::{bound_digest, Keystore};

/// Overlay parameters a policy needs besides the value itself.
#[derive(Clone, Copy)]
pub struct PolicyContext<'a> {
    pub keystore: &'a dyn Keystore,
    pub resource_id_length: usize,
    pub hash_algorithm: HashAlgorithm,
}

impl PolicyContext<'_> {
    fn resource_id(&self, parts: &[&[u8]]) -> Result<ResourceId, NodeError> {
        let digest = self.hash_algorithm.digest_parts(parts);
        Ok(ResourceId::from_digest(&digest, self.resource_id_length)?)
    }

    fn certificate(&self, identity: &SignerIdentity) -> Result<OverlayCertificate, NodeError> {
        if bound_digest(identity).is_none() {
            return Err(NodeError::AccessPolicy(
                "signer identity carries no usable hash".into(),
            ));
        }
        self.keystore
            .certificate(identity)
            .ok_or_else(|| NodeError::AccessPolicy("signer certificate is unknown".into()))
    }
}

pub trait AccessPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with [`NodeError::AccessPolicy`] unless `identity` may store
    /// `data` under `kind` at `resource`.
    fn accept(
        &self,
        ctx: &PolicyContext<'_>,
        resource: &ResourceId,
        kind: &DataKind,
        data: &StoredData,
        identity: &SignerIdentity,
    ) -> Result<(), NodeError>;
}

static NODE_MATCH: NodeMatch = NodeMatch;
static USER_MATCH: UserMatch = UserMatch;
static NODE_MULTIPLE: NodeMultiple = NodeMultiple;

pub fn policy_for(kind: AccessPolicyKind) -> &'static dyn AccessPolicy {
    match kind {
        AccessPolicyKind::NodeMatch => &NODE_MATCH,
        AccessPolicyKind::UserMatch => &USER_MATCH,
        AccessPolicyKind::NodeMultiple => &NODE_MULTIPLE,
    }
}

pub fn policy_by_name(name: &str) -> Option<&'static dyn AccessPolicy> {
    AccessPolicyKind::from_name(name).map(policy_for)
}

fn node_bound_certificate(
    ctx: &PolicyContext<'_>,
    identity: &SignerIdentity,
) -> Result<OverlayCertificate, NodeError> {
    let SignerIdentity::CertHashNodeId {
        hash_algorithm,
        hash,
    } = identity
    else {
        return Err(NodeError::AccessPolicy(format!(
            "expected a cert_hash_node_id identity, got {:?}",
            identity.identity_type()
        )));
    };
    let certificate = ctx.certificate(identity)?;
    if certificate.cert_hash_node_id(*hash_algorithm).as_slice() != &hash[..] {
        return Err(NodeError::AccessPolicy(
            "identity hash does not match the signer certificate".into(),
        ));
    }
    Ok(certificate)
}

/// Resource id = hash(node id) of the signer.
#[derive(Debug)]
pub struct NodeMatch;

impl NodeMatch {
    pub fn resource_id_for(
        node_id: &NodeId,
        resource_id_length: usize,
        hash_algorithm: HashAlgorithm,
    ) -> Result<ResourceId, NodeError> {
        let digest = hash_algorithm.digest(node_id.as_bytes());
        Ok(ResourceId::from_digest(&digest, resource_id_length)?)
    }
}

impl AccessPolicy for NodeMatch {
    fn name(&self) -> &'static str {
        AccessPolicyKind::NodeMatch.name()
    }

    fn accept(
        &self,
        ctx: &PolicyContext<'_>,
        resource: &ResourceId,
        _kind: &DataKind,
        _data: &StoredData,
        identity: &SignerIdentity,
    ) -> Result<(), NodeError> {
        let certificate = node_bound_certificate(ctx, identity)?;
        let expected = Self::resource_id_for(
            &certificate.node_id,
            ctx.resource_id_length,
            ctx.hash_algorithm,
        )?;
        if &expected != resource {
            return Err(NodeError::AccessPolicy(format!(
                "node {} may not write resource {resource}",
                certificate.node_id
            )));
        }
        Ok(())
    }
}

/// Resource id = hash(user name) of the signer.
#[derive(Debug)]
pub struct UserMatch;

impl AccessPolicy for UserMatch {
    fn name(&self) -> &'static str {
        AccessPolicyKind::UserMatch.name()
    }

    fn accept(
        &self,
        ctx: &PolicyContext<'_>,
        resource: &ResourceId,
        _kind: &DataKind,
        _data: &StoredData,
        identity: &SignerIdentity,
    ) -> Result<(), NodeError> {
        let SignerIdentity::CertHash {
            hash_algorithm,
            hash,
        } = identity
        else {
            return Err(NodeError::AccessPolicy(format!(
                "expected a cert_hash identity, got {:?}",
                identity.identity_type()
            )));
        };
        let certificate = ctx.certificate(identity)?;
        if certificate.cert_hash(*hash_algorithm).as_slice() != &hash[..] {
            return Err(NodeError::AccessPolicy(
                "identity hash does not match the signer certificate".into(),
            ));
        }
        let expected = ctx.resource_id(&[certificate.user_name.as_bytes()])?;
        if &expected != resource {
            return Err(NodeError::AccessPolicy(format!(
                "user {} may not write resource {resource}",
                certificate.user_name
            )));
        }
        Ok(())
    }
}

/// Resource id = hash(node id ‖ i) for some i in 1..=max-node-multiple.
#[derive(Debug)]
pub struct NodeMultiple;

impl AccessPolicy for NodeMultiple {
    fn name(&self) -> &'static str {
        AccessPolicyKind::NodeMultiple.name()
    }

    fn accept(
        &self,
        ctx: &PolicyContext<'_>,
        resource: &ResourceId,
        kind: &DataKind,
        _data: &StoredData,
        identity: &SignerIdentity,
    ) -> Result<(), NodeError> {
        let max = kind.param_u32(MAX_NODE_MULTIPLE_PARAM).ok_or_else(|| {
            NodeError::AccessPolicy(format!("kind {} lacks {MAX_NODE_MULTIPLE_PARAM}", kind.id))
        })?;
        let certificate = node_bound_certificate(ctx, identity)?;
        let node = certificate.node_id.as_bytes();
        for i in 1..=max {
            if &ctx.resource_id(&[node, &i.to_be_bytes()])? == resource {
                return Ok(());
            }
        }
        Err(NodeError::AccessPolicy(format!(
            "node {} may not write resource {resource}",
            certificate.node_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeystore;
    use bytes::Bytes;
    use ringlet_codec::storage::DataModel;

    const LEN: usize = 16;
    const ALG: HashAlgorithm = HashAlgorithm::Sha256;

    fn certificate(byte: u8, user: &str) -> OverlayCertificate {
        OverlayCertificate::self_issued(NodeId::new(vec![byte; LEN]).unwrap(), user, [byte; 32])
    }

    fn node_identity(cert: &OverlayCertificate) -> SignerIdentity {
        SignerIdentity::CertHashNodeId {
            hash_algorithm: ALG,
            hash: Bytes::from(cert.cert_hash_node_id(ALG)),
        }
    }

    fn user_identity(cert: &OverlayCertificate) -> SignerIdentity {
        SignerIdentity::CertHash {
            hash_algorithm: ALG,
            hash: Bytes::from(cert.cert_hash(ALG)),
        }
    }

    fn ctx(keystore: &MemoryKeystore) -> PolicyContext<'_> {
        PolicyContext {
            keystore,
            resource_id_length: LEN,
            hash_algorithm: ALG,
        }
    }

    fn value() -> StoredData {
        StoredData::non_existent(DataModel::Single)
    }

    fn kind(policy: AccessPolicyKind) -> DataKind {
        DataKind::new(1, "test", DataModel::Single, policy).with_param(MAX_NODE_MULTIPLE_PARAM, "3")
    }

    #[test]
    fn node_match_accepts_the_owning_node() {
        let keystore = MemoryKeystore::new();
        let cert = certificate(1, "alice");
        keystore.add(cert.clone());
        let resource = NodeMatch::resource_id_for(&cert.node_id, LEN, ALG).unwrap();
        let policy = policy_for(AccessPolicyKind::NodeMatch);
        policy
            .accept(
                &ctx(&keystore),
                &resource,
                &kind(AccessPolicyKind::NodeMatch),
                &value(),
                &node_identity(&cert),
            )
            .unwrap();
    }

    #[test]
    fn node_match_rejects_other_resources_and_identities() {
        let keystore = MemoryKeystore::new();
        let cert = certificate(1, "alice");
        let other = certificate(2, "bob");
        keystore.add(cert.clone());
        let ctx = ctx(&keystore);
        let kind = kind(AccessPolicyKind::NodeMatch);
        let policy = policy_for(AccessPolicyKind::NodeMatch);
        let own = NodeMatch::resource_id_for(&cert.node_id, LEN, ALG).unwrap();
        let foreign = NodeMatch::resource_id_for(&other.node_id, LEN, ALG).unwrap();

        let rejected = [
            (foreign, node_identity(&cert)),
            (own.clone(), user_identity(&cert)),
            (own.clone(), node_identity(&other)),
            (own.clone(), SignerIdentity::None),
            (
                own,
                SignerIdentity::CertHashNodeId {
                    hash_algorithm: HashAlgorithm::None,
                    hash: Bytes::new(),
                },
            ),
        ];
        for (resource, identity) in rejected {
            assert!(matches!(
                policy.accept(&ctx, &resource, &kind, &value(), &identity),
                Err(NodeError::AccessPolicy(_))
            ));
        }
    }

    #[test]
    fn user_match_uses_the_user_name() {
        let keystore = MemoryKeystore::new();
        let cert = certificate(3, "carol");
        keystore.add(cert.clone());
        let ctx = ctx(&keystore);
        let kind = kind(AccessPolicyKind::UserMatch);
        let resource = ctx.resource_id(&[b"carol".as_slice()]).unwrap();
        let policy = policy_by_name("user-match").unwrap();
        assert_eq!(policy.name(), "user-match");
        policy
            .accept(&ctx, &resource, &kind, &value(), &user_identity(&cert))
            .unwrap();
        assert!(policy
            .accept(&ctx, &resource, &kind, &value(), &node_identity(&cert))
            .is_err());
        let unhashed = SignerIdentity::CertHash {
            hash_algorithm: HashAlgorithm::None,
            hash: Bytes::new(),
        };
        assert!(matches!(
            policy.accept(&ctx, &resource, &kind, &value(), &unhashed),
            Err(NodeError::AccessPolicy(_))
        ));
    }

    #[test]
    fn node_multiple_accepts_indices_up_to_the_limit() {
        let keystore = MemoryKeystore::new();
        let cert = certificate(4, "dan");
        keystore.add(cert.clone());
        let ctx = ctx(&keystore);
        let kind = kind(AccessPolicyKind::NodeMultiple);
        let policy = policy_for(AccessPolicyKind::NodeMultiple);
        let at = |i: u32| {
            ctx.resource_id(&[cert.node_id.as_bytes(), &i.to_be_bytes()])
                .unwrap()
        };
        for i in 1..=3 {
            policy
                .accept(&ctx, &at(i), &kind, &value(), &node_identity(&cert))
                .unwrap();
        }
        for i in [0, 4] {
            assert!(policy
                .accept(&ctx, &at(i), &kind, &value(), &node_identity(&cert))
                .is_err());
        }
    }
}
