use bytes::{Bytes, BytesMut};
use ringlet_core::NodeId;

use crate::error::CodecError;
use crate::field::{read_opaque, write_opaque, DecodeContext, LengthWidth, WireDecode, WireEncode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub joining_node: NodeId,
    /// Topology-specific payload, opaque to the codec.
    pub overlay_data: Bytes,
}

impl WireEncode for JoinRequest {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        self.joining_node.encode(out)?;
        write_opaque(out, LengthWidth::U16, &self.overlay_data)
    }
}

impl WireDecode for JoinRequest {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            joining_node: NodeId::decode(input, ctx)?,
            overlay_data: read_opaque(input, LengthWidth::U16)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinAnswer {
    pub overlay_data: Bytes,
}

impl WireEncode for JoinAnswer {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_opaque(out, LengthWidth::U16, &self.overlay_data)
    }
}

impl WireDecode for JoinAnswer {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            overlay_data: read_opaque(input, LengthWidth::U16)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub leaving_node: NodeId,
    pub overlay_data: Bytes,
}

impl WireEncode for LeaveRequest {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        self.leaving_node.encode(out)?;
        write_opaque(out, LengthWidth::U16, &self.overlay_data)
    }
}

impl WireDecode for LeaveRequest {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            leaving_node: NodeId::decode(input, ctx)?,
            overlay_data: read_opaque(input, LengthWidth::U16)?,
        })
    }
}

/// Acknowledges a leave; carries no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaveAnswer;

impl WireEncode for LeaveAnswer {
    fn encode(&self, _out: &mut BytesMut) -> Result<(), CodecError> {
        Ok(())
    }
}

impl WireDecode for LeaveAnswer {
    fn decode(_input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self)
    }
}
