use std::sync::Arc;

use ringlet_codec::content::{FetchAnswer, FetchRequest, StatAnswer, StoreAnswer, StoreRequest};
use ringlet_codec::storage::{
    signed_value_payload, AccessPolicyKind, DataKind, DataValue, StoreKindData, StoredData,
};
use ringlet_codec::SignerIdentity;
use ringlet_core::{HashAlgorithm, NodeId, ResourceId, RoutableId};
use ringlet_crypto::Verifier;
use tracing::{debug, warn};

use super::local_store::LocalStore;
use super::policy::{policy_for, PolicyContext};
use crate::error::NodeError;
use crate::identity::LocalIdentity;
use crate::keystore::Keystore;
use crate::topology::Topology;

/// A store to forward to a replica node once the local store committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaStore {
    pub target: NodeId,
    pub request: StoreRequest,
}

/// Store, fetch and stat handling on top of the [`LocalStore`].
pub struct StorageService {
    store: LocalStore,
    keystore: Arc<dyn Keystore>,
    resource_id_length: usize,
    hash_algorithm: HashAlgorithm,
}

impl StorageService {
    pub fn new(
        keystore: Arc<dyn Keystore>,
        verifier: Arc<dyn Verifier>,
        resource_id_length: usize,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            store: LocalStore::new(verifier),
            keystore,
            resource_id_length,
            hash_algorithm,
        }
    }

    pub fn local_store(&self) -> &LocalStore {
        &self.store
    }

    fn policy_context(&self) -> PolicyContext<'_> {
        PolicyContext {
            keystore: self.keystore.as_ref(),
            resource_id_length: self.resource_id_length,
            hash_algorithm: self.hash_algorithm,
        }
    }

    /// Runs the kind checks and commits `request`.
    ///
    /// A first-hand store (replica number 0) is only taken by the peer
    /// responsible for the resource and queues one [`ReplicaStore`] per
    /// replica node and accepted kind into `replicas`. Those are queued even
    /// when another kind of the same request fails on its generation.
    pub fn handle_store(
        &self,
        request: &StoreRequest,
        message_signer: &SignerIdentity,
        topology: &Topology,
        replicas: &mut Vec<ReplicaStore>,
    ) -> Result<StoreAnswer, NodeError> {
        let resource = &request.resource;
        let first_hand = request.replica_number == 0;
        let destination = RoutableId::Resource(resource.clone());
        if first_hand && !topology.is_local_peer_responsible(&destination) {
            return Err(NodeError::Forbidden(format!(
                "not responsible for resource {resource}"
            )));
        }

        let storer = request
            .kind_data
            .iter()
            .flat_map(|data| data.values.iter())
            .map(|value| &value.signature.identity)
            .find(|identity| **identity != SignerIdentity::None)
            .unwrap_or(message_signer);
        let certificate = self.keystore.certificate(storer).ok_or_else(|| {
            NodeError::Forbidden(format!("storer {:?} is unknown", storer.identity_type()))
        })?;

        let ctx = self.policy_context();
        for data in &request.kind_data {
            self.check_kind(&ctx, resource, data)?;
        }

        let targets = if first_hand {
            topology.replica_nodes(resource)
        } else {
            Vec::new()
        };
        let responses = self.store.store(
            resource,
            request.kind_data.clone(),
            certificate.public_key,
            |resource, data| {
                for (i, target) in targets.iter().enumerate() {
                    replicas.push(ReplicaStore {
                        target: target.clone(),
                        request: StoreRequest {
                            resource: resource.clone(),
                            replica_number: u8::try_from(i + 1).unwrap_or(u8::MAX),
                            kind_data: vec![data.clone()],
                        },
                    });
                }
                targets.clone()
            },
        )?;
        debug!(
            "stored {} kind(s) at {resource} (replica {})",
            responses.len(),
            request.replica_number
        );
        Ok(StoreAnswer { responses })
    }

    fn check_kind(
        &self,
        ctx: &PolicyContext<'_>,
        resource: &ResourceId,
        data: &StoreKindData,
    ) -> Result<(), NodeError> {
        let kind = &data.kind;
        if data.values.len() > kind.max_count as usize {
            return Err(NodeError::DataTooLarge(format!(
                "{} values for kind {}, at most {}",
                data.values.len(),
                kind.id,
                kind.max_count
            )));
        }
        let policy = policy_for(kind.policy);
        for value in &data.values {
            if value.value.size() > kind.max_size as usize {
                return Err(NodeError::DataTooLarge(format!(
                    "{} byte value for kind {}, at most {}",
                    value.value.size(),
                    kind.id,
                    kind.max_size
                )));
            }
            if let Err(err) = policy.accept(ctx, resource, kind, value, &value.signature.identity) {
                warn!("{} policy rejected kind {} at {resource}: {err}", policy.name(), kind.id);
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn handle_fetch(&self, request: &FetchRequest) -> FetchAnswer {
        FetchAnswer {
            responses: self.store.fetch(&request.resource, &request.specifiers),
        }
    }

    pub fn handle_stat(&self, request: &FetchRequest) -> StatAnswer {
        StatAnswer {
            responses: self
                .store
                .stat(&request.resource, &request.specifiers, self.hash_algorithm),
        }
    }

    /// Builds a value of `kind` signed by `identity` for `resource`.
    ///
    /// User-scoped kinds are signed with the user identity, every other
    /// kind with the node identity.
    pub fn sign_value(
        identity: &LocalIdentity,
        resource: &ResourceId,
        kind: &DataKind,
        generation: u64,
        lifetime: u32,
        value: DataValue,
    ) -> Result<StoredData, NodeError> {
        let signer = match kind.policy {
            AccessPolicyKind::UserMatch => identity.user_identity(),
            AccessPolicyKind::NodeMatch | AccessPolicyKind::NodeMultiple => {
                identity.node_identity()
            }
        };
        let payload = signed_value_payload(resource, kind.id, generation, &value, &signer)?;
        let signature = identity.sign(signer, &payload)?;
        Ok(StoredData {
            generation,
            lifetime,
            value,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeystore;
    use crate::storage::NodeMatch;
    use ringlet_codec::storage::DataModel;
    use ringlet_crypto::Ed25519Verifier;

    const LEN: usize = 16;
    const ALG: HashAlgorithm = HashAlgorithm::Sha256;

    struct Fixture {
        service: StorageService,
        topology: Topology,
        identity: LocalIdentity,
        kind: Arc<DataKind>,
        resource: ResourceId,
    }

    fn fixture() -> Fixture {
        let keystore = Arc::new(MemoryKeystore::new());
        let local = NodeId::new(vec![0x10; LEN]).unwrap();
        let identity = LocalIdentity::generate(local.clone(), "alice", ALG);
        keystore.add(identity.certificate().clone());
        let resource = NodeMatch::resource_id_for(&local, LEN, ALG).unwrap();
        Fixture {
            service: StorageService::new(keystore, Arc::new(Ed25519Verifier), LEN, ALG),
            topology: Topology::new(local, true, 2),
            identity,
            kind: Arc::new(
                DataKind::new(5, "status", DataModel::Single, AccessPolicyKind::NodeMatch)
                    .with_max_size(8),
            ),
            resource,
        }
    }

    impl Fixture {
        fn request(&self, generation: u64, payload: &[u8], replica_number: u8) -> StoreRequest {
            let value = DataModel::Single.builder().value(payload.to_vec()).build();
            let stored = StorageService::sign_value(
                &self.identity,
                &self.resource,
                &self.kind,
                generation,
                60,
                value,
            )
            .unwrap();
            StoreRequest {
                resource: self.resource.clone(),
                replica_number,
                kind_data: vec![StoreKindData {
                    kind: Arc::clone(&self.kind),
                    generation,
                    values: vec![stored],
                }],
            }
        }

        fn store(
            &self,
            request: &StoreRequest,
        ) -> (Result<StoreAnswer, NodeError>, Vec<ReplicaStore>) {
            let mut replicas = Vec::new();
            let result = self.service.handle_store(
                request,
                &self.identity.node_identity(),
                &self.topology,
                &mut replicas,
            );
            (result, replicas)
        }
    }

    #[test]
    fn owner_store_is_accepted_and_replicated() {
        let f = fixture();
        let local_distance = ringlet_core::distance(f.topology.local_id(), &f.resource);
        let replica = (0..=u8::MAX)
            .map(|b| NodeId::new(vec![b; LEN]).unwrap())
            .find(|n| ringlet_core::distance(n, &f.resource) > local_distance)
            .unwrap();
        f.topology.add_neighbor(replica.clone());

        let (result, replicas) = f.store(&f.request(1, b"online", 0));
        let answer = result.unwrap();
        assert_eq!(answer.responses[0].replicas, vec![replica.clone()]);
        assert_eq!(replicas.len(), 1);
        assert_eq!(replicas[0].target, replica);
        assert_eq!(replicas[0].request.replica_number, 1);
    }

    #[test]
    fn lone_initiator_stores_and_fetches() {
        let f = fixture();
        let (result, replicas) = f.store(&f.request(3, b"online", 0));
        assert_eq!(result.unwrap().responses[0].generation, 3);
        assert!(replicas.is_empty());

        let fetch = FetchRequest {
            resource: f.resource.clone(),
            specifiers: vec![ringlet_codec::storage::StoredDataSpecifier::all(&f.kind, 0)],
        };
        let answer = f.service.handle_fetch(&fetch);
        assert_eq!(answer.responses[0].values[0].value.single().value.as_ref(), b"online");
        let stat = f.service.handle_stat(&fetch);
        assert_eq!(stat.responses[0].generation, 3);
    }

    #[test]
    fn oversized_values_are_rejected() {
        let f = fixture();
        let (result, _) = f.store(&f.request(1, b"far too long", 0));
        assert!(matches!(result, Err(NodeError::DataTooLarge(_))));
        assert_eq!(f.service.local_store().size(), 0);
    }

    #[test]
    fn too_many_values_are_rejected() {
        let f = fixture();
        let mut request = f.request(1, b"a", 0);
        let value = request.kind_data[0].values[0].clone();
        request.kind_data[0].values = vec![value; DataKind::DEFAULT_MAX_COUNT as usize + 1];
        let (result, _) = f.store(&request);
        assert!(matches!(result, Err(NodeError::DataTooLarge(_))));
    }

    #[test]
    fn store_for_a_foreign_resource_is_refused_by_the_policy() {
        let f = fixture();
        let mut request = f.request(1, b"x", 0);
        let other = NodeId::new(vec![0x42; LEN]).unwrap();
        request.resource = NodeMatch::resource_id_for(&other, LEN, ALG).unwrap();
        let (result, _) = f.store(&request);
        assert!(matches!(result, Err(NodeError::AccessPolicy(_))));
    }

    #[test]
    fn replica_store_skips_the_responsibility_check() {
        let f = fixture();
        let joiner = Topology::new(NodeId::new(vec![0x20; LEN]).unwrap(), false, 2);
        let mut replicas = Vec::new();
        let first_hand = f.request(1, b"x", 0);
        assert!(matches!(
            f.service.handle_store(&first_hand, &SignerIdentity::None, &joiner, &mut replicas),
            Err(NodeError::Forbidden(_))
        ));

        let replica = f.request(1, b"x", 1);
        f.service
            .handle_store(&replica, &SignerIdentity::None, &joiner, &mut replicas)
            .unwrap();
        assert!(replicas.is_empty());
    }

    #[test]
    fn user_kinds_are_signed_with_the_user_identity() {
        let f = fixture();
        let kind = DataKind::new(6, "profile", DataModel::Single, AccessPolicyKind::UserMatch);
        let value = StorageService::sign_value(
            &f.identity,
            &f.resource,
            &kind,
            1,
            60,
            DataModel::Single.builder().value(b"hi".to_vec()).build(),
        )
        .unwrap();
        assert_eq!(value.signature.identity, f.identity.user_identity());
    }
}
