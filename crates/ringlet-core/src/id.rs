use std::fmt;

use crate::error::CoreError;

/// Largest identifier width representable behind a one-byte length prefix.
pub const MAX_ID_LEN: usize = 255;

macro_rules! ring_id {
    ($(#[$meta:meta])* $name:ident, $min:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Box<[u8]>);

        impl $name {
            pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, CoreError> {
                let bytes = bytes.into();
                if bytes.len() < $min || bytes.len() > MAX_ID_LEN {
                    return Err(CoreError::InvalidIdLength {
                        len: bytes.len(),
                        min: $min,
                        max: MAX_ID_LEN,
                    });
                }
                Ok(Self(bytes.into_boxed_slice()))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(&self.0))
            }
        }
    };
}

ring_id!(
    /// Identifier of a peer on the ring.
    NodeId,
    1
);
ring_id!(
    /// Identifier of a storage location on the ring, usually derived by hashing.
    ResourceId,
    1
);
ring_id!(
    /// Opaque destination label, meaningful only to the peer that issued it.
    OpaqueId,
    0
);

impl NodeId {
    /// The all-ones node id, addressing whichever peer receives the message.
    pub fn wildcard(len: usize) -> Self {
        Self(vec![0xff; len.clamp(1, MAX_ID_LEN)].into_boxed_slice())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.iter().all(|b| *b == 0xff)
    }
}

impl ResourceId {
    /// Resource id occupying the same ring position as `node`.
    pub fn from_node_id(node: &NodeId) -> Self {
        Self(node.0.clone())
    }

    /// Resource id made of the first `len` bytes of `digest`.
    pub fn from_digest(digest: &[u8], len: usize) -> Result<Self, CoreError> {
        if len > digest.len() {
            return Err(CoreError::InvalidIdLength {
                len,
                min: 1,
                max: digest.len(),
            });
        }
        Self::new(&digest[..len])
    }
}

/// Destination discriminator used on the wire and for routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationType {
    Node,
    Resource,
    Opaque,
}

impl DestinationType {
    pub const fn code(self) -> u8 {
        match self {
            Self::Node => 1,
            Self::Resource => 2,
            Self::Opaque => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Node),
            2 => Some(Self::Resource),
            3 => Some(Self::Opaque),
            _ => None,
        }
    }
}

/// Any identifier a message can be routed toward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoutableId {
    Node(NodeId),
    Resource(ResourceId),
    Opaque(OpaqueId),
}

impl RoutableId {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Node(id) => id.as_bytes(),
            Self::Resource(id) => id.as_bytes(),
            Self::Opaque(id) => id.as_bytes(),
        }
    }

    pub fn destination_type(&self) -> DestinationType {
        match self {
            Self::Node(_) => DestinationType::Node,
            Self::Resource(_) => DestinationType::Resource,
            Self::Opaque(_) => DestinationType::Opaque,
        }
    }

    pub fn as_node(&self) -> Option<&NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }
}

impl AsRef<[u8]> for RoutableId {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<NodeId> for RoutableId {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<ResourceId> for RoutableId {
    fn from(id: ResourceId) -> Self {
        Self::Resource(id)
    }
}

impl From<OpaqueId> for RoutableId {
    fn from(id: OpaqueId) -> Self {
        Self::Opaque(id)
    }
}

impl fmt::Display for RoutableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node:{id}"),
            Self::Resource(id) => write!(f, "resource:{id}"),
            Self::Opaque(id) => write!(f, "opaque:{id}"),
        }
    }
}
