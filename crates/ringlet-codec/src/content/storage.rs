use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::{NodeId, ResourceId};

use crate::error::CodecError;
use crate::field::{
    read_list, write_list, DecodeContext, LengthWidth, WireDecode, WireEncode, WireRead,
};
use crate::storage::{KindId, StoreKindData, StoredData, StoredDataSpecifier, StoredMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    pub resource: ResourceId,
    /// Zero for the responsible peer, position in the replica set otherwise.
    pub replica_number: u8,
    pub kind_data: Vec<StoreKindData>,
}

impl WireEncode for StoreRequest {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        self.resource.encode(out)?;
        out.put_u8(self.replica_number);
        write_list(out, LengthWidth::U32, &self.kind_data, |data, out| data.encode(out))
    }
}

impl WireDecode for StoreRequest {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resource: ResourceId::decode(input, ctx)?,
            replica_number: input.read_u8()?,
            kind_data: read_list(input, LengthWidth::U32, |r| StoreKindData::decode(r, ctx))?,
        })
    }
}

/// Outcome of storing one kind: the generation now held and where it was replicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKindResponse {
    pub kind: KindId,
    pub generation: u64,
    pub replicas: Vec<NodeId>,
}

impl WireEncode for StoreKindResponse {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u32(self.kind.0);
        out.put_u64(self.generation);
        write_list(out, LengthWidth::U16, &self.replicas, |node, out| node.encode(out))
    }
}

impl WireDecode for StoreKindResponse {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            kind: KindId(input.read_u32()?),
            generation: input.read_u64()?,
            replicas: read_list(input, LengthWidth::U16, |r| NodeId::decode(r, ctx))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreAnswer {
    pub responses: Vec<StoreKindResponse>,
}

impl WireEncode for StoreAnswer {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_list(out, LengthWidth::U16, &self.responses, |r, out| r.encode(out))
    }
}

impl WireDecode for StoreAnswer {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            responses: read_list(input, LengthWidth::U16, |r| StoreKindResponse::decode(r, ctx))?,
        })
    }
}

/// Body of fetch and stat requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub resource: ResourceId,
    pub specifiers: Vec<StoredDataSpecifier>,
}

pub type StatRequest = FetchRequest;

impl WireEncode for FetchRequest {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        self.resource.encode(out)?;
        write_list(out, LengthWidth::U16, &self.specifiers, |s, out| s.encode(out))
    }
}

impl WireDecode for FetchRequest {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            resource: ResourceId::decode(input, ctx)?,
            specifiers: read_list(input, LengthWidth::U16, |r| {
                StoredDataSpecifier::decode(r, ctx)
            })?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchKindResponse {
    pub kind: KindId,
    pub generation: u64,
    pub values: Vec<StoredData>,
}

impl WireEncode for FetchKindResponse {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u32(self.kind.0);
        out.put_u64(self.generation);
        write_list(out, LengthWidth::U32, &self.values, |v, out| v.encode(out))
    }
}

impl WireDecode for FetchKindResponse {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let kind = ctx.kinds.resolve(KindId(input.read_u32()?))?;
        let generation = input.read_u64()?;
        let values = read_list(input, LengthWidth::U32, |r| {
            StoredData::decode_for(r, ctx, kind.model)
        })?;
        Ok(Self {
            kind: kind.id,
            generation,
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchAnswer {
    pub responses: Vec<FetchKindResponse>,
}

impl WireEncode for FetchAnswer {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_list(out, LengthWidth::U32, &self.responses, |r, out| r.encode(out))
    }
}

impl WireDecode for FetchAnswer {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            responses: read_list(input, LengthWidth::U32, |r| FetchKindResponse::decode(r, ctx))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatKindResponse {
    pub kind: KindId,
    pub generation: u64,
    pub values: Vec<StoredMetadata>,
}

impl WireEncode for StatKindResponse {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u32(self.kind.0);
        out.put_u64(self.generation);
        write_list(out, LengthWidth::U32, &self.values, |v, out| v.encode(out))
    }
}

impl WireDecode for StatKindResponse {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let kind = ctx.kinds.resolve(KindId(input.read_u32()?))?;
        let generation = input.read_u64()?;
        let values = read_list(input, LengthWidth::U32, |r| {
            StoredMetadata::decode_for(r, kind.model)
        })?;
        Ok(Self {
            kind: kind.id,
            generation,
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatAnswer {
    pub responses: Vec<StatKindResponse>,
}

impl WireEncode for StatAnswer {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_list(out, LengthWidth::U32, &self.responses, |r, out| r.encode(out))
    }
}

impl WireDecode for StatAnswer {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            responses: read_list(input, LengthWidth::U32, |r| StatKindResponse::decode(r, ctx))?,
        })
    }
}
