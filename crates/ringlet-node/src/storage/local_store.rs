use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use ringlet_codec::content::{FetchKindResponse, StatKindResponse, StoreKindResponse};
use ringlet_codec::storage::{KindId, StoreKindData, StoredData, StoredDataSpecifier};
use ringlet_codec::SignatureAlgorithm;
use ringlet_core::{HashAlgorithm, NodeId, ResourceId};
use ringlet_crypto::Verifier;
use tracing::debug;

use crate::error::NodeError;

const SHARDS: usize = 16;

type StoreKey = (ResourceId, KindId);

/// Values held by this peer, keyed by resource and kind.
///
/// Keys spread over independently locked shards; the generation compare and
/// the replace of one key happen under its shard's write lock.
pub struct LocalStore {
    shards: Vec<RwLock<HashMap<StoreKey, StoreKindData>>>,
    verifier: Arc<dyn Verifier>,
}

impl LocalStore {
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
            verifier,
        }
    }

    fn shard(&self, key: &StoreKey) -> &RwLock<HashMap<StoreKey, StoreKindData>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARDS]
    }

    /// Commits each kind whose generation beats the stored one.
    ///
    /// Every value must carry a signature by `storer_public_key` over its
    /// location; one bad signature rejects the call before anything is
    /// written. `replicate` runs after each commit and names the nodes the
    /// data goes to. Kinds whose generation is not newer are reported
    /// together as [`NodeError::GenerationTooLow`] with the stored
    /// generations, while the other kinds stay committed.
    pub fn store<F>(
        &self,
        resource: &ResourceId,
        kind_data: Vec<StoreKindData>,
        storer_public_key: [u8; 32],
        mut replicate: F,
    ) -> Result<Vec<StoreKindResponse>, NodeError>
    where
        F: FnMut(&ResourceId, &StoreKindData) -> Vec<NodeId>,
    {
        for data in &kind_data {
            for value in &data.values {
                self.verify(resource, data.kind.id, value, storer_public_key)?;
            }
        }

        let mut accepted = Vec::with_capacity(kind_data.len());
        let mut too_low = Vec::new();
        for data in kind_data {
            let key = (resource.clone(), data.kind.id);
            let kind = data.kind.id;
            let generation = data.generation;
            {
                let mut shard = self.shard(&key).write();
                let old_generation = shard.get(&key).map_or(0, |stored| stored.generation);
                if generation <= old_generation {
                    debug!(
                        "kind {kind} at {resource}: generation {generation} <= {old_generation}"
                    );
                    too_low.push(StoreKindResponse {
                        kind,
                        generation: old_generation,
                        replicas: Vec::new(),
                    });
                    continue;
                }
                shard.insert(key, data.clone());
            }
            let replicas = replicate(resource, &data);
            accepted.push(StoreKindResponse {
                kind,
                generation,
                replicas,
            });
        }

        if too_low.is_empty() {
            Ok(accepted)
        } else {
            Err(NodeError::GenerationTooLow(too_low))
        }
    }

    fn verify(
        &self,
        resource: &ResourceId,
        kind: KindId,
        value: &StoredData,
        public_key: [u8; 32],
    ) -> Result<(), NodeError> {
        if value.signature.algorithm != SignatureAlgorithm::Ed25519 {
            return Err(NodeError::Signature(format!(
                "kind {kind} value is not ed25519 signed"
            )));
        }
        let payload = value.signed_payload(resource, kind)?;
        if self
            .verifier
            .verify(public_key, &payload, &value.signature.value)?
        {
            Ok(())
        } else {
            Err(NodeError::Signature(format!(
                "kind {kind} value signature does not verify"
            )))
        }
    }

    /// Values matching each specifier, skipping kinds already current.
    pub fn fetch(
        &self,
        resource: &ResourceId,
        specifiers: &[StoredDataSpecifier],
    ) -> Vec<FetchKindResponse> {
        self.select(resource, specifiers, |values, data| {
            FetchKindResponse {
                kind: data.kind.id,
                generation: data.generation,
                values: if values.is_empty() {
                    vec![StoredData::non_existent(data.kind.model)]
                } else {
                    values.into_iter().cloned().collect()
                },
            }
        })
    }

    /// Same selection as [`LocalStore::fetch`], answering with metadata only.
    pub fn stat(
        &self,
        resource: &ResourceId,
        specifiers: &[StoredDataSpecifier],
        hash_algorithm: HashAlgorithm,
    ) -> Vec<StatKindResponse> {
        self.select(resource, specifiers, |values, data| {
            let values = if values.is_empty() {
                vec![StoredData::non_existent(data.kind.model).metadata(hash_algorithm)]
            } else {
                values.into_iter().map(|v| v.metadata(hash_algorithm)).collect()
            };
            StatKindResponse {
                kind: data.kind.id,
                generation: data.generation,
                values,
            }
        })
    }

    fn select<R, F>(
        &self,
        resource: &ResourceId,
        specifiers: &[StoredDataSpecifier],
        mut answer: F,
    ) -> Vec<R>
    where
        F: FnMut(Vec<&StoredData>, &StoreKindData) -> R,
    {
        let mut responses = Vec::new();
        for specifier in specifiers {
            let key = (resource.clone(), specifier.kind);
            let shard = self.shard(&key).read();
            let Some(data) = shard.get(&key) else {
                continue;
            };
            if specifier.generation == data.generation {
                continue;
            }
            let matching: Vec<&StoredData> = data
                .values
                .iter()
                .filter(|v| specifier.specifier.matches(&v.value))
                .collect();
            responses.push(answer(matching, data));
        }
        responses
    }

    /// Drops every kind stored at `resource`, returning how many there were.
    pub fn remove_resource(&self, resource: &ResourceId) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut shard = shard.write();
                let before = shard.len();
                shard.retain(|(r, _), _| r != resource);
                before - shard.len()
            })
            .sum()
    }

    /// Point-in-time copy of everything stored.
    pub fn stored_resources(&self) -> BTreeMap<(ResourceId, KindId), StoreKindData> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn generation(&self, resource: &ResourceId, kind: KindId) -> Option<u64> {
        let key = (resource.clone(), kind);
        self.shard(&key).read().get(&key).map(|d| d.generation)
    }

    /// Number of stored (resource, kind) entries.
    pub fn size(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}
