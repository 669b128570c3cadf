use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;
use crate::field::{
    read_field, read_list, write_field, write_list, DecodeContext, LengthWidth, WireDecode,
    WireEncode, WireRead,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeInformationType {
    ResponsibleSet,
    NumResources,
    Uptime,
}

impl ProbeInformationType {
    pub const fn code(self) -> u8 {
        match self {
            Self::ResponsibleSet => 1,
            Self::NumResources => 2,
            Self::Uptime => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            1 => Ok(Self::ResponsibleSet),
            2 => Ok(Self::NumResources),
            3 => Ok(Self::Uptime),
            other => Err(CodecError::UnknownTag {
                what: "probe information type",
                tag: u32::from(other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeRequest {
    pub requested: Vec<ProbeInformationType>,
}

impl WireEncode for ProbeRequest {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_list(out, LengthWidth::U8, &self.requested, |t, out| {
            out.put_u8(t.code());
            Ok(())
        })
    }
}

impl WireDecode for ProbeRequest {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let requested = read_list(input, LengthWidth::U8, |r| {
            ProbeInformationType::from_code(r.read_u8()?)
        })?;
        Ok(Self { requested })
    }
}

/// One answered probe item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeInformation {
    /// Fraction of the ring this peer is responsible for, scaled to `u32::MAX`.
    ResponsibleSet(u32),
    NumResources(u32),
    /// Seconds since the peer started.
    Uptime(u32),
}

impl ProbeInformation {
    pub fn info_type(&self) -> ProbeInformationType {
        match self {
            Self::ResponsibleSet(_) => ProbeInformationType::ResponsibleSet,
            Self::NumResources(_) => ProbeInformationType::NumResources,
            Self::Uptime(_) => ProbeInformationType::Uptime,
        }
    }
}

impl WireEncode for ProbeInformation {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(self.info_type().code());
        let value = match self {
            Self::ResponsibleSet(v) | Self::NumResources(v) | Self::Uptime(v) => *v,
        };
        write_field(out, LengthWidth::U8, |out| {
            out.put_u32(value);
            Ok(())
        })
    }
}

impl WireDecode for ProbeInformation {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let info_type = ProbeInformationType::from_code(input.read_u8()?)?;
        let value = read_field(input, LengthWidth::U8)?.read_u32()?;
        Ok(match info_type {
            ProbeInformationType::ResponsibleSet => Self::ResponsibleSet(value),
            ProbeInformationType::NumResources => Self::NumResources(value),
            ProbeInformationType::Uptime => Self::Uptime(value),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeAnswer {
    pub information: Vec<ProbeInformation>,
}

impl WireEncode for ProbeAnswer {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_list(out, LengthWidth::U16, &self.information, |info, out| info.encode(out))
    }
}

impl WireDecode for ProbeAnswer {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let information = read_list(input, LengthWidth::U16, |r| ProbeInformation::decode(r, ctx))?;
        Ok(Self { information })
    }
}
