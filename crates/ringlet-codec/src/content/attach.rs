use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::OverlayLinkType;

use crate::error::CodecError;
use crate::field::{
    read_field, read_list, read_opaque, write_field, write_list, write_opaque, DecodeContext,
    LengthWidth, WireDecode, WireEncode, WireRead,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateType {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relayed,
}

impl CandidateType {
    pub const fn code(self) -> u8 {
        match self {
            Self::Host => 1,
            Self::ServerReflexive => 2,
            Self::PeerReflexive => 3,
            Self::Relayed => 4,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            1 => Ok(Self::Host),
            2 => Ok(Self::ServerReflexive),
            3 => Ok(Self::PeerReflexive),
            4 => Ok(Self::Relayed),
            other => Err(CodecError::UnknownTag {
                what: "candidate type",
                tag: u32::from(other),
            }),
        }
    }
}

fn encode_address(addr: &SocketAddr, out: &mut BytesMut) -> Result<(), CodecError> {
    let (tag, ip) = match addr.ip() {
        IpAddr::V4(ip) => (1_u8, ip.octets().to_vec()),
        IpAddr::V6(ip) => (2_u8, ip.octets().to_vec()),
    };
    out.put_u8(tag);
    write_field(out, LengthWidth::U8, |out| {
        out.put_slice(&ip);
        out.put_u16(addr.port());
        Ok(())
    })
}

fn decode_address(input: &mut Bytes) -> Result<SocketAddr, CodecError> {
    let tag = input.read_u8()?;
    let mut body = read_field(input, LengthWidth::U8)?;
    let ip = match tag {
        1 => {
            let raw = body.read_bytes(4)?;
            IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
        }
        2 => {
            let raw = body.read_bytes(16)?;
            let mut octets = [0_u8; 16];
            octets.copy_from_slice(&raw);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        other => {
            return Err(CodecError::UnknownTag {
                what: "address type",
                tag: u32::from(other),
            })
        }
    };
    Ok(SocketAddr::new(ip, body.read_u16()?))
}

/// Transport address a peer can be reached at, offered during attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub address: SocketAddr,
    pub link_type: OverlayLinkType,
    pub foundation: Bytes,
    pub priority: u32,
    pub candidate_type: CandidateType,
}

impl IceCandidate {
    pub fn host(address: SocketAddr, link_type: OverlayLinkType) -> Self {
        Self {
            address,
            link_type,
            foundation: Bytes::from_static(b"host"),
            priority: 1,
            candidate_type: CandidateType::Host,
        }
    }
}

impl WireEncode for IceCandidate {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        encode_address(&self.address, out)?;
        out.put_u8(self.link_type.code());
        write_opaque(out, LengthWidth::U8, &self.foundation)?;
        out.put_u32(self.priority);
        out.put_u8(self.candidate_type.code());
        // extension list, always empty
        write_opaque(out, LengthWidth::U16, &[])
    }
}

impl WireDecode for IceCandidate {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let address = decode_address(input)?;
        let link = input.read_u8()?;
        let link_type = OverlayLinkType::from_code(link).ok_or(CodecError::UnknownTag {
            what: "overlay link type",
            tag: u32::from(link),
        })?;
        let foundation = read_opaque(input, LengthWidth::U8)?;
        let priority = input.read_u32()?;
        let candidate_type = CandidateType::from_code(input.read_u8()?)?;
        read_field(input, LengthWidth::U16)?;
        Ok(Self {
            address,
            link_type,
            foundation,
            priority,
            candidate_type,
        })
    }
}

/// Body shared by attach requests and answers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttachReqAns {
    pub ufrag: Bytes,
    pub password: Bytes,
    pub role: Bytes,
    pub candidates: Vec<IceCandidate>,
    pub send_update: bool,
}

impl WireEncode for AttachReqAns {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        write_opaque(out, LengthWidth::U8, &self.ufrag)?;
        write_opaque(out, LengthWidth::U8, &self.password)?;
        write_opaque(out, LengthWidth::U8, &self.role)?;
        write_list(out, LengthWidth::U16, &self.candidates, |c, out| c.encode(out))?;
        out.put_u8(u8::from(self.send_update));
        Ok(())
    }
}

impl WireDecode for AttachReqAns {
    fn decode(input: &mut Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ufrag: read_opaque(input, LengthWidth::U8)?,
            password: read_opaque(input, LengthWidth::U8)?,
            role: read_opaque(input, LengthWidth::U8)?,
            candidates: read_list(input, LengthWidth::U16, |r| IceCandidate::decode(r, ctx))?,
            send_update: input.read_bool()?,
        })
    }
}
