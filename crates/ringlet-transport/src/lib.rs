//! Connection seam between the overlay node and its transports.
//!
//! The node talks to peers through [`Connection`] handles produced by a
//! [`Connector`] and learns about traffic through [`TransportEvent`]s.
//! [`memory`] provides an in-process network for tests and simulations.

pub mod connection;
pub mod error;
pub mod memory;

pub use connection::{Connection, ConnectionTable, Connector, FrameSink, TransportEvent};
pub use error::TransportError;
pub use memory::{MemoryConnector, MemoryNetwork};
