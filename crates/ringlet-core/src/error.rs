use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Identifier byte string outside the permitted width.
    #[error("invalid identifier length {len} (expected {min}..={max})")]
    InvalidIdLength { len: usize, min: usize, max: usize },
    /// Hash algorithm code without a local implementation.
    #[error("unsupported hash algorithm code {0}")]
    UnsupportedHash(u8),
    /// Link type name not known to this node.
    #[error("unknown overlay link type: {0}")]
    UnknownLinkType(String),
}
