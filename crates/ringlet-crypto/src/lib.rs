//! Cryptographic helpers used by ringlet.
//!
//! Includes Ed25519 signing/verification abstractions and certificate-bound
//! signer identities.

pub mod certificate;
pub mod signing;

pub use certificate::{cert_hash, cert_hash_node_id, OverlayCertificate};
pub use signing::{Ed25519Signer, Ed25519Verifier, Signer, SigningError, Verifier};
