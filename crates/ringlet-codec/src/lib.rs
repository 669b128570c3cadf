//! ringlet wire codec.
//!
//! Length-prefixed binary framing for messages (`Header || Content ||
//! SecurityBlock`) and the storage structures they carry.

pub mod content;
pub mod error;
pub mod field;
pub mod header;
pub mod id;
pub mod message;
pub mod security;
pub mod storage;

pub use content::{Content, ContentType, ErrorCode, ErrorContent};
pub use error::CodecError;
pub use field::{DecodeContext, LengthField, LengthWidth, WireDecode, WireEncode, WireRead};
pub use header::Header;
pub use message::Message;
pub use security::{
    GenericCertificate, SecurityBlock, Signature, SignatureAlgorithm, SignerIdentity,
};
