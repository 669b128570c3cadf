use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::HashAlgorithm;

use crate::error::CodecError;
use crate::field::{
    read_field, read_list, read_opaque, write_field, write_list, write_opaque, DecodeContext,
    LengthWidth, WireDecode, WireEncode, WireRead,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateType {
    X509,
    Pgp,
}

impl CertificateType {
    pub const fn code(self) -> u8 {
        match self {
            Self::X509 => 0,
            Self::Pgp => 1,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            0 => Ok(Self::X509),
            1 => Ok(Self::Pgp),
            other => Err(CodecError::UnknownTag {
                what: "certificate type",
                tag: u32::from(other),
            }),
        }
    }
}

/// A certificate carried verbatim; interpretation is left to the keystore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericCertificate {
    pub cert_type: CertificateType,
    pub der: Bytes,
}

impl WireEncode for GenericCertificate {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(self.cert_type.code());
        write_opaque(out, LengthWidth::U16, &self.der)
    }
}

impl WireDecode for GenericCertificate {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let cert_type = CertificateType::from_code(input.read_u8()?)?;
        let der = read_opaque(input, LengthWidth::U16)?;
        Ok(Self { cert_type, der })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityType {
    CertHash,
    CertHashNodeId,
    None,
}

impl IdentityType {
    pub const fn code(self) -> u8 {
        match self {
            Self::CertHash => 1,
            Self::CertHashNodeId => 2,
            Self::None => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            1 => Ok(Self::CertHash),
            2 => Ok(Self::CertHashNodeId),
            3 => Ok(Self::None),
            other => Err(CodecError::UnknownTag {
                what: "identity type",
                tag: u32::from(other),
            }),
        }
    }
}

/// Who produced a signature, identified by a hash over their certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignerIdentity {
    /// Hash of the signer certificate.
    CertHash {
        hash_algorithm: HashAlgorithm,
        hash: Bytes,
    },
    /// Hash of the signer certificate followed by the signing node id.
    CertHashNodeId {
        hash_algorithm: HashAlgorithm,
        hash: Bytes,
    },
    None,
}

impl SignerIdentity {
    pub fn identity_type(&self) -> IdentityType {
        match self {
            Self::CertHash { .. } => IdentityType::CertHash,
            Self::CertHashNodeId { .. } => IdentityType::CertHashNodeId,
            Self::None => IdentityType::None,
        }
    }

    fn encode_value(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Self::CertHash {
                hash_algorithm,
                hash,
            }
            | Self::CertHashNodeId {
                hash_algorithm,
                hash,
            } => {
                out.put_u8(hash_algorithm.code());
                write_opaque(out, LengthWidth::U8, hash)
            }
            Self::None => Ok(()),
        }
    }

    /// Decodes the identity value whose shape is fixed by `identity_type`.
    pub fn decode_for(input: &mut Bytes, identity_type: IdentityType) -> Result<Self, CodecError> {
        match identity_type {
            IdentityType::None => Ok(Self::None),
            IdentityType::CertHash | IdentityType::CertHashNodeId => {
                let hash_algorithm = HashAlgorithm::from_code(input.read_u8()?)?;
                let hash = read_opaque(input, LengthWidth::U8)?;
                Ok(if identity_type == IdentityType::CertHash {
                    Self::CertHash {
                        hash_algorithm,
                        hash,
                    }
                } else {
                    Self::CertHashNodeId {
                        hash_algorithm,
                        hash,
                    }
                })
            }
        }
    }
}

impl WireEncode for SignerIdentity {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(self.identity_type().code());
        write_field(out, LengthWidth::U16, |out| self.encode_value(out))
    }
}

impl WireDecode for SignerIdentity {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let identity_type = IdentityType::from_code(input.read_u8()?)?;
        let mut value = read_field(input, LengthWidth::U16)?;
        Self::decode_for(&mut value, identity_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Anonymous,
    Ed25519,
}

impl SignatureAlgorithm {
    pub const fn code(self) -> u8 {
        match self {
            Self::Anonymous => 0,
            Self::Ed25519 => 7,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            0 => Ok(Self::Anonymous),
            7 => Ok(Self::Ed25519),
            other => Err(CodecError::UnknownTag {
                what: "signature algorithm",
                tag: u32::from(other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub hash_algorithm: HashAlgorithm,
    pub algorithm: SignatureAlgorithm,
    pub identity: SignerIdentity,
    pub value: Bytes,
}

impl Signature {
    /// Placeholder signature for values that nobody signed.
    pub fn anonymous() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::None,
            algorithm: SignatureAlgorithm::Anonymous,
            identity: SignerIdentity::None,
            value: Bytes::new(),
        }
    }
}

impl WireEncode for Signature {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(self.hash_algorithm.code());
        out.put_u8(self.algorithm.code());
        self.identity.encode(out)?;
        write_opaque(out, LengthWidth::U16, &self.value)
    }
}

impl WireDecode for Signature {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let hash_algorithm = HashAlgorithm::from_code(input.read_u8()?)?;
        let algorithm = SignatureAlgorithm::from_code(input.read_u8()?)?;
        let identity = SignerIdentity::decode(input, ctx)?;
        let value = read_opaque(input, LengthWidth::U16)?;
        Ok(Self {
            hash_algorithm,
            algorithm,
            identity,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityBlock {
    pub certificates: Vec<GenericCertificate>,
    pub signature: Signature,
}

impl SecurityBlock {
    pub fn unsigned() -> Self {
        Self {
            certificates: Vec::new(),
            signature: Signature::anonymous(),
        }
    }
}

impl WireEncode for SecurityBlock {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_list(out, LengthWidth::U16, &self.certificates, |cert, out| cert.encode(out))?;
        self.signature.encode(out)
    }
}

impl WireDecode for SecurityBlock {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let certificates =
            read_list(input, LengthWidth::U16, |r| GenericCertificate::decode(r, ctx))?;
        let signature = Signature::decode(input, ctx)?;
        Ok(Self {
            certificates,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KindRegistry;

    fn identity() -> SignerIdentity {
        SignerIdentity::CertHashNodeId {
            hash_algorithm: HashAlgorithm::Sha256,
            hash: Bytes::from_static(&[0x5a; 32]),
        }
    }

    #[test]
    fn identity_value_shape_follows_its_type() {
        let bytes = identity().to_bytes().unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..3], &[0x00, 34]);
        assert_eq!(bytes[3], 4);
        assert_eq!(bytes[4], 32);

        let none = SignerIdentity::None.to_bytes().unwrap();
        assert_eq!(&none[..], &[3, 0, 0]);
    }

    #[test]
    fn trailing_identity_bytes_are_skipped() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let mut input = Bytes::from_static(&[3, 0, 2, 0xde, 0xad, 0x42]);
        assert_eq!(SignerIdentity::decode(&mut input, &ctx).unwrap(), SignerIdentity::None);
        assert_eq!(&input[..], &[0x42]);
    }

    #[test]
    fn security_block_decodes_what_it_encodes() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let block = SecurityBlock {
            certificates: vec![GenericCertificate {
                cert_type: CertificateType::X509,
                der: Bytes::from_static(b"cert"),
            }],
            signature: Signature {
                hash_algorithm: HashAlgorithm::Sha256,
                algorithm: SignatureAlgorithm::Ed25519,
                identity: identity(),
                value: Bytes::from(vec![7_u8; 64]),
            },
        };
        let mut bytes = block.to_bytes().unwrap();
        assert_eq!(SecurityBlock::decode(&mut bytes, &ctx).unwrap(), block);
        assert!(bytes.is_empty());
    }

    #[test]
    fn unknown_signature_algorithm_is_rejected() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let mut input = Bytes::from_static(&[0, 9, 3, 0, 0, 0, 0]);
        assert!(matches!(
            Signature::decode(&mut input, &ctx),
            Err(CodecError::UnknownTag {
                what: "signature algorithm",
                ..
            })
        ));
    }
}
