//! Core ringlet primitives shared across crates.
//!
//! Includes ring identifiers, the distance metric, hash algorithms, overlay
//! link types, and base errors.

pub mod distance;
pub mod error;
pub mod hash;
pub mod id;
pub mod link;

pub use distance::{distance, DISTANCE_MODULUS};
pub use error::CoreError;
pub use hash::HashAlgorithm;
pub use id::{DestinationType, NodeId, OpaqueId, ResourceId, RoutableId, MAX_ID_LEN};
pub use link::OverlayLinkType;
