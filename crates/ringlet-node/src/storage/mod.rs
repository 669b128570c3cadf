//! Storage engine: the local store, the access policies guarding it and the
//! request handling around both.

mod local_store;
mod policy;
mod service;

pub use local_store::LocalStore;
pub use policy::{
    policy_by_name, policy_for, AccessPolicy, NodeMatch, NodeMultiple, PolicyContext, UserMatch,
};
pub use service::{ReplicaStore, StorageService};
