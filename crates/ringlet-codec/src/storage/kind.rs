use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::CodecError;
use crate::storage::model::DataModel;

/// Numeric identifier of a kind, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(pub u32);

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access policy a kind is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicyKind {
    NodeMatch,
    UserMatch,
    NodeMultiple,
}

/// Kind parameter bounding the NODE-MULTIPLE suffix range.
pub const MAX_NODE_MULTIPLE_PARAM: &str = "max-node-multiple";

impl AccessPolicyKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::NodeMatch => "node-match",
            Self::UserMatch => "user-match",
            Self::NodeMultiple => "node-multiple",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "node-match" => Some(Self::NodeMatch),
            "user-match" => Some(Self::UserMatch),
            "node-multiple" => Some(Self::NodeMultiple),
            _ => None,
        }
    }

    /// Kind parameters the policy cannot evaluate without.
    pub const fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::NodeMultiple => &[MAX_NODE_MULTIPLE_PARAM],
            Self::NodeMatch | Self::UserMatch => &[],
        }
    }
}

/// Descriptor of a storable kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataKind {
    pub id: KindId,
    pub name: String,
    pub model: DataModel,
    pub policy: AccessPolicyKind,
    /// Largest accepted value payload in bytes.
    pub max_size: u32,
    /// Largest number of values accepted per store.
    pub max_count: u32,
    pub params: BTreeMap<String, String>,
}

impl DataKind {
    pub const DEFAULT_MAX_SIZE: u32 = 64 * 1024;
    pub const DEFAULT_MAX_COUNT: u32 = 256;

    pub fn new(
        id: u32,
        name: impl Into<String>,
        model: DataModel,
        policy: AccessPolicyKind,
    ) -> Self {
        Self {
            id: KindId(id),
            name: name.into(),
            model,
            policy,
            max_size: Self::DEFAULT_MAX_SIZE,
            max_count: Self::DEFAULT_MAX_COUNT,
            params: BTreeMap::new(),
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param_u32(&self, key: &str) -> Option<u32> {
        self.params.get(key).and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KindError {
    #[error("kind {0} is already registered")]
    Duplicate(KindId),
    #[error("kind {kind} uses policy {policy}, which requires the {param} parameter")]
    MissingParam {
        kind: KindId,
        policy: &'static str,
        param: &'static str,
    },
    #[error("kind {kind} parameter {param} must be a positive integer")]
    InvalidParam { kind: KindId, param: &'static str },
}

/// Kinds known to one overlay node, built once at startup.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: HashMap<KindId, Arc<DataKind>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `kind` after checking its policy has every parameter it needs.
    pub fn register(&mut self, kind: DataKind) -> Result<Arc<DataKind>, KindError> {
        if self.kinds.contains_key(&kind.id) {
            return Err(KindError::Duplicate(kind.id));
        }
        for &param in kind.policy.required_params() {
            if !kind.params.contains_key(param) {
                return Err(KindError::MissingParam {
                    kind: kind.id,
                    policy: kind.policy.name(),
                    param,
                });
            }
            if !matches!(kind.param_u32(param), Some(v) if v > 0) {
                return Err(KindError::InvalidParam {
                    kind: kind.id,
                    param,
                });
            }
        }
        let kind = Arc::new(kind);
        self.kinds.insert(kind.id, Arc::clone(&kind));
        Ok(kind)
    }

    pub fn get(&self, id: KindId) -> Option<Arc<DataKind>> {
        self.kinds.get(&id).cloned()
    }

    pub fn resolve(&self, id: KindId) -> Result<Arc<DataKind>, CodecError> {
        self.get(id).ok_or(CodecError::UnknownKind(id.0))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
