//! Storage wire model: kinds, data models, stored values and specifiers.

pub mod data;
pub mod kind;
pub mod model;

pub use data::{
    signed_value_payload, StoreKindData, StoredData, StoredDataSpecifier, StoredMetadata,
};
pub use kind::{
    AccessPolicyKind, DataKind, KindError, KindId, KindRegistry, MAX_NODE_MULTIPLE_PARAM,
};
pub use model::{
    ArrayRange, DataModel, DataValue, Metadata, ModelSpecifier, SingleMetadata, SingleValue,
    ValueBuilder, LAST_INDEX,
};
