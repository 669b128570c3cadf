//! ringlet overlay node.
//!
//! An [`OverlayNode`] joins a structured peer-to-peer ring, routes messages
//! toward the peer closest to a destination id and stores signed values for
//! the resources it is responsible for.
//!
//! The node is transport agnostic: it dials through a
//! [`ringlet_transport::Connector`] and is driven by the transport's event
//! queue via [`OverlayNode::spawn`].

pub mod config;
pub mod error;
pub mod identity;
pub mod keystore;
pub mod message;
pub mod node;
mod overlay;
pub mod router;
pub mod storage;
pub mod topology;

pub use config::OverlayConfig;
pub use error::NodeError;
pub use identity::LocalIdentity;
pub use keystore::{Keystore, MemoryKeystore};
pub use message::MessageBuilder;
pub use node::{OverlayNode, RuntimeStats};
pub use storage::{AccessPolicy, LocalStore, StorageService};
pub use topology::Topology;
