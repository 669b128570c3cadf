use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::field::{
    read_field, write_field, DecodeContext, LengthWidth, WireDecode, WireEncode, WireRead,
};

/// Liveness probe; the padding lets a sender test path MTU.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PingRequest {
    pub padding: u16,
}

impl WireEncode for PingRequest {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_field(out, LengthWidth::U16, |out| {
            out.put_bytes(0, usize::from(self.padding));
            Ok(())
        })
    }
}

impl WireDecode for PingRequest {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let padding = read_field(input, LengthWidth::U16)?;
        Ok(Self {
            padding: padding.len() as u16,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingAnswer {
    pub response_id: u64,
    /// Milliseconds since the Unix epoch at the responder.
    pub time: u64,
}

impl WireEncode for PingAnswer {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u64(self.response_id);
        out.put_u64(self.time);
        Ok(())
    }
}

impl WireDecode for PingAnswer {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            response_id: input.read_u64()?,
            time: input.read_u64()?,
        })
    }
}
