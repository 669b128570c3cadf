use ringlet_core::CoreError;
use thiserror::Error;

/// Errors returned while encoding or decoding wire structures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes remain in the current field than the read requires.
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    /// A length prefix announces more bytes than its enclosing field holds.
    #[error("declared length {declared} exceeds the {available} available bytes")]
    LengthOverflow { declared: u64, available: usize },
    /// Type discriminator without a registered decoder.
    #[error("unknown {what} tag {tag:#x}")]
    UnknownTag { what: &'static str, tag: u32 },
    /// Fixed-width value whose length disagrees with the overlay parameters.
    #[error("{what} length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Encoded body too long for the width of its length prefix.
    #[error("field of {len} bytes exceeds the {max} byte bound of its length prefix")]
    FieldTooLarge { len: usize, max: u64 },
    /// Kind id not present in the kind registry.
    #[error("unknown data kind {0}")]
    UnknownKind(u32),
    /// Structurally valid bytes carrying a value this codec refuses.
    #[error("invalid {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Core(#[from] CoreError),
}
