use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::{HashAlgorithm, ResourceId};

use crate::error::CodecError;
use crate::field::{
    read_field, read_list, write_field, write_list, DecodeContext, LengthWidth, WireDecode,
    WireEncode, WireRead,
};
use crate::security::{Signature, SignerIdentity};
use crate::storage::kind::{DataKind, KindId};
use crate::storage::model::{DataModel, DataValue, Metadata, ModelSpecifier};

/// One signed value stored for a kind at a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredData {
    /// Per-value generation (the storage time chosen by the writer).
    pub generation: u64,
    /// Seconds the value stays valid.
    pub lifetime: u32,
    pub value: DataValue,
    pub signature: Signature,
}

impl StoredData {
    /// Stand-in returned by fetch when nothing matches the specifier.
    pub fn non_existent(model: DataModel) -> Self {
        Self {
            generation: 0,
            lifetime: 0,
            value: model.default_value(),
            signature: Signature::anonymous(),
        }
    }

    pub fn metadata(&self, hash_algorithm: HashAlgorithm) -> StoredMetadata {
        StoredMetadata {
            generation: self.generation,
            lifetime: self.lifetime,
            metadata: self.value.metadata(hash_algorithm),
        }
    }

    /// Bytes covered by the value signature: the storage location, the
    /// value itself and the claimed signer.
    pub fn signed_payload(&self, resource: &ResourceId, kind: KindId) -> Result<Bytes, CodecError> {
        signed_value_payload(resource, kind, self.generation, &self.value, &self.signature.identity)
    }

    pub fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_field(out, LengthWidth::U32, |out| {
            out.put_u64(self.generation);
            out.put_u32(self.lifetime);
            self.value.encode(out)?;
            self.signature.encode(out)
        })
    }

    pub fn decode_for(
        input: &mut Bytes,
        ctx: &DecodeContext<'_>,
        model: DataModel,
    ) -> Result<Self, CodecError> {
        let mut body = read_field(input, LengthWidth::U32)?;
        let generation = body.read_u64()?;
        let lifetime = body.read_u32()?;
        let value = DataValue::decode_for(&mut body, model)?;
        let signature = Signature::decode(&mut body, ctx)?;
        Ok(Self {
            generation,
            lifetime,
            value,
            signature,
        })
    }
}

/// Builds the signature input for a value before a `StoredData` exists.
pub fn signed_value_payload(
    resource: &ResourceId,
    kind: KindId,
    generation: u64,
    value: &DataValue,
    identity: &SignerIdentity,
) -> Result<Bytes, CodecError> {
    let mut out = BytesMut::new();
    out.put_slice(resource.as_bytes());
    out.put_u32(kind.0);
    out.put_u64(generation);
    value.encode(&mut out)?;
    identity.encode(&mut out)?;
    Ok(out.freeze())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMetadata {
    pub generation: u64,
    pub lifetime: u32,
    pub metadata: Metadata,
}

impl StoredMetadata {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_field(out, LengthWidth::U32, |out| {
            out.put_u64(self.generation);
            out.put_u32(self.lifetime);
            self.metadata.encode(out)
        })
    }

    pub fn decode_for(input: &mut Bytes, model: DataModel) -> Result<Self, CodecError> {
        let mut body = read_field(input, LengthWidth::U32)?;
        Ok(Self {
            generation: body.read_u64()?,
            lifetime: body.read_u32()?,
            metadata: Metadata::decode_for(&mut body, model)?,
        })
    }
}

/// The values of one kind exchanged in a store, with the kind-wide generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKindData {
    pub kind: Arc<DataKind>,
    pub generation: u64,
    pub values: Vec<StoredData>,
}

impl WireEncode for StoreKindData {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u32(self.kind.id.0);
        out.put_u64(self.generation);
        write_list(out, LengthWidth::U32, &self.values, |value, out| value.encode(out))
    }
}

impl WireDecode for StoreKindData {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let kind = ctx.kinds.resolve(KindId(input.read_u32()?))?;
        let generation = input.read_u64()?;
        let values = read_list(input, LengthWidth::U32, |r| {
            StoredData::decode_for(r, ctx, kind.model)
        })?;
        Ok(Self {
            kind,
            generation,
            values,
        })
    }
}

/// Selects values of one kind for fetch or stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDataSpecifier {
    pub kind: KindId,
    /// Generation the requester already holds; zero when it holds nothing.
    pub generation: u64,
    pub specifier: ModelSpecifier,
}

impl StoredDataSpecifier {
    /// Specifier matching every value of `kind`.
    pub fn all(kind: &DataKind, generation: u64) -> Self {
        Self {
            kind: kind.id,
            generation,
            specifier: kind.model.match_all(),
        }
    }
}

impl WireEncode for StoredDataSpecifier {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u32(self.kind.0);
        out.put_u64(self.generation);
        write_field(out, LengthWidth::U16, |out| self.specifier.encode(out))
    }
}

impl WireDecode for StoredDataSpecifier {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let kind = ctx.kinds.resolve(KindId(input.read_u32()?))?;
        let generation = input.read_u64()?;
        let mut body = read_field(input, LengthWidth::U16)?;
        let specifier = ModelSpecifier::decode_for(&mut body, kind.model)?;
        Ok(Self {
            kind: kind.id,
            generation,
            specifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kind::{AccessPolicyKind, KindRegistry};

    fn registry() -> (KindRegistry, Arc<DataKind>) {
        let mut kinds = KindRegistry::new();
        let kind = kinds
            .register(DataKind::new(
                7,
                "blob",
                DataModel::Array,
                AccessPolicyKind::NodeMatch,
            ))
            .unwrap();
        (kinds, kind)
    }

    #[test]
    fn store_kind_data_decodes_with_registered_model() {
        let (kinds, kind) = registry();
        let ctx = DecodeContext::new(16, &kinds);
        let data = StoreKindData {
            kind: Arc::clone(&kind),
            generation: 3,
            values: vec![StoredData {
                generation: 11,
                lifetime: 60,
                value: DataModel::Array.builder().index(2).value(&b"v"[..]).build(),
                signature: Signature::anonymous(),
            }],
        };
        let mut bytes = data.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 7]);
        assert_eq!(&bytes[4..12], &3_u64.to_be_bytes());
        assert_eq!(StoreKindData::decode(&mut bytes, &ctx).unwrap(), data);
    }

    #[test]
    fn unregistered_kind_fails_decode() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(16, &kinds);
        let mut bytes = Bytes::from_static(&[0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(
            StoreKindData::decode(&mut bytes, &ctx).expect_err("unknown kind"),
            CodecError::UnknownKind(9)
        );
    }

    #[test]
    fn signed_payload_binds_location_and_identity() {
        let resource = ResourceId::new(vec![1, 2, 3]).unwrap();
        let value = DataModel::Single.builder().value(&b"x"[..]).build();
        let anonymous = SignerIdentity::None;
        let a = signed_value_payload(&resource, KindId(1), 5, &value, &anonymous).unwrap();
        let b = signed_value_payload(&resource, KindId(2), 5, &value, &anonymous).unwrap();
        assert_ne!(a, b);
        assert_eq!(&a[..3], &[1, 2, 3]);
    }

    #[test]
    fn non_existent_value_is_anonymous() {
        let data = StoredData::non_existent(DataModel::Dictionary);
        assert_eq!(data.generation, 0);
        assert_eq!(data.lifetime, 0);
        assert!(!data.value.exists());
        assert_eq!(data.signature, Signature::anonymous());
    }
}
