use std::net::SocketAddr;

use ringlet_core::OverlayLinkType;
use thiserror::Error;

/// Error type for transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no peer reachable at {0}")]
    Unreachable(SocketAddr),
    #[error("peer at {address} does not accept {link} links")]
    UnsupportedLink {
        address: SocketAddr,
        link: OverlayLinkType,
    },
    #[error("address {0} is already bound")]
    AddressInUse(SocketAddr),
    #[error("connection closed")]
    Closed,
}
