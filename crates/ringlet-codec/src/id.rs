use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::{DestinationType, NodeId, OpaqueId, ResourceId, RoutableId};

use crate::error::CodecError;
use crate::field::{
    read_opaque, write_opaque, DecodeContext, LengthWidth, WireDecode, WireEncode, WireRead,
};

impl WireEncode for NodeId {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_opaque(out, LengthWidth::U8, self.as_bytes())
    }
}

impl WireDecode for NodeId {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let raw = read_opaque(input, LengthWidth::U8)?;
        decode_node_bytes(raw, ctx)
    }
}

fn decode_node_bytes(raw: Bytes, ctx: &DecodeContext<'_>) -> Result<NodeId, CodecError> {
    if raw.len() != ctx.node_id_length {
        return Err(CodecError::LengthMismatch {
            what: "node id",
            expected: ctx.node_id_length,
            found: raw.len(),
        });
    }
    Ok(NodeId::new(raw.to_vec())?)
}

fn decode_resource_bytes(raw: Bytes, ctx: &DecodeContext<'_>) -> Result<ResourceId, CodecError> {
    if raw.len() != ctx.resource_id_length {
        return Err(CodecError::LengthMismatch {
            what: "resource id",
            expected: ctx.resource_id_length,
            found: raw.len(),
        });
    }
    Ok(ResourceId::new(raw.to_vec())?)
}

impl WireEncode for ResourceId {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_opaque(out, LengthWidth::U8, self.as_bytes())
    }
}

impl WireDecode for ResourceId {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let raw = read_opaque(input, LengthWidth::U8)?;
        decode_resource_bytes(raw, ctx)
    }
}

impl WireEncode for OpaqueId {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_opaque(out, LengthWidth::U8, self.as_bytes())
    }
}

impl WireDecode for OpaqueId {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let raw = read_opaque(input, LengthWidth::U8)?;
        Ok(OpaqueId::new(raw.to_vec())?)
    }
}

/// Destination entries: a type byte followed by the length-prefixed id.
impl WireEncode for RoutableId {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(self.destination_type().code());
        write_opaque(out, LengthWidth::U8, self.as_bytes())
    }
}

impl WireDecode for RoutableId {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let tag = input.read_u8()?;
        let kind = DestinationType::from_code(tag).ok_or(CodecError::UnknownTag {
            what: "destination type",
            tag: u32::from(tag),
        })?;
        let raw = read_opaque(input, LengthWidth::U8)?;
        Ok(match kind {
            DestinationType::Node => RoutableId::Node(decode_node_bytes(raw, ctx)?),
            DestinationType::Resource => RoutableId::Resource(decode_resource_bytes(raw, ctx)?),
            DestinationType::Opaque => RoutableId::Opaque(OpaqueId::new(raw.to_vec())?),
        })
    }
}
