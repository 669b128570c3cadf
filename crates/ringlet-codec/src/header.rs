use bytes::{BufMut, Bytes, BytesMut};
use ringlet_core::{NodeId, RoutableId};

use crate::error::CodecError;
use crate::field::{
    read_field, read_list, read_opaque, write_list, write_opaque, DecodeContext, LengthField,
    LengthWidth, WireDecode, WireEncode, WireRead,
};

/// Leading token identifying a ringlet message.
pub const RELO_TOKEN: u32 = 0xd245_4c4f;
pub const PROTOCOL_VERSION: u8 = 10;
/// Fragment field of a message sent in one piece.
pub const UNFRAGMENTED: u32 = 0xc000_0000;
pub const DEFAULT_TTL: u8 = 100;

/// Forwarding option flag: the message must be dropped by peers that do not understand it.
pub const FORWARD_CRITICAL: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingOption {
    pub option_type: u8,
    pub flags: u8,
    pub data: Bytes,
}

impl ForwardingOption {
    pub fn is_critical(&self) -> bool {
        self.flags & FORWARD_CRITICAL != 0
    }
}

impl WireEncode for ForwardingOption {
    fn encode(&self, out: &mut BytesMut) -> Result<(), CodecError> {
        out.put_u8(self.option_type);
        out.put_u8(self.flags);
        write_opaque(out, LengthWidth::U16, &self.data)
    }
}

impl WireDecode for ForwardingOption {
    fn decode(input: &mut Bytes, _ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            option_type: input.read_u8()?,
            flags: input.read_u8()?,
            data: read_opaque(input, LengthWidth::U16)?,
        })
    }
}

/// Routing header of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Truncated hash of the overlay name.
    pub overlay: u32,
    pub configuration_sequence: u16,
    pub version: u8,
    pub ttl: u8,
    pub transaction_id: u64,
    pub max_response_length: u32,
    /// Originating peer.
    pub sender: NodeId,
    /// Peers the message has been relayed through, oldest first.
    pub via_list: Vec<RoutableId>,
    /// Remaining destinations, next one first.
    pub destination_list: Vec<RoutableId>,
    pub forwarding_options: Vec<ForwardingOption>,
    /// Peer the message arrived from. Local only, never encoded.
    pub previous_hop: Option<NodeId>,
    /// Neighbor to hand an outbound message to instead of routing it.
    /// Local only, never encoded.
    pub next_hop: Option<NodeId>,
}

impl Header {
    pub fn new(
        overlay: u32,
        transaction_id: u64,
        sender: NodeId,
        destination_list: Vec<RoutableId>,
    ) -> Self {
        Self {
            overlay,
            configuration_sequence: 0,
            version: PROTOCOL_VERSION,
            ttl: DEFAULT_TTL,
            transaction_id,
            max_response_length: 0,
            sender,
            via_list: Vec::new(),
            destination_list,
            forwarding_options: Vec::new(),
            previous_hop: None,
            next_hop: None,
        }
    }

    /// Writes the header and leaves the message length open.
    ///
    /// The returned field covers everything written after it, so the
    /// message encoder patches it once content and security block follow.
    pub(crate) fn encode_open(&self, out: &mut BytesMut) -> Result<LengthField, CodecError> {
        out.put_u32(RELO_TOKEN);
        out.put_u32(self.overlay);
        out.put_u16(self.configuration_sequence);
        out.put_u8(self.version);
        out.put_u8(self.ttl);
        out.put_u32(UNFRAGMENTED);
        let length = LengthField::reserve(out, LengthWidth::U32);
        out.put_u64(self.transaction_id);
        out.put_u32(self.max_response_length);
        self.sender.encode(out)?;
        write_list(out, LengthWidth::U16, &self.via_list, |id, out| id.encode(out))?;
        write_list(out, LengthWidth::U16, &self.destination_list, |id, out| id.encode(out))?;
        write_list(out, LengthWidth::U16, &self.forwarding_options, |opt, out| opt.encode(out))?;
        Ok(length)
    }

    /// Reads a header and returns it with the rest of the message region.
    pub(crate) fn decode_framed(
        input: &mut Bytes,
        ctx: &DecodeContext<'_>,
    ) -> Result<(Self, Bytes), CodecError> {
        let token = input.read_u32()?;
        if token != RELO_TOKEN {
            return Err(CodecError::Invalid("message token"));
        }
        let overlay = input.read_u32()?;
        let configuration_sequence = input.read_u16()?;
        let version = input.read_u8()?;
        let ttl = input.read_u8()?;
        if input.read_u32()? != UNFRAGMENTED {
            return Err(CodecError::Invalid("fragmented message"));
        }
        let mut body = read_field(input, LengthWidth::U32)?;
        let transaction_id = body.read_u64()?;
        let max_response_length = body.read_u32()?;
        let sender = NodeId::decode(&mut body, ctx)?;
        let via_list = read_list(&mut body, LengthWidth::U16, |r| RoutableId::decode(r, ctx))?;
        let destination_list =
            read_list(&mut body, LengthWidth::U16, |r| RoutableId::decode(r, ctx))?;
        let forwarding_options =
            read_list(&mut body, LengthWidth::U16, |r| ForwardingOption::decode(r, ctx))?;
        let header = Self {
            overlay,
            configuration_sequence,
            version,
            ttl,
            transaction_id,
            max_response_length,
            sender,
            via_list,
            destination_list,
            forwarding_options,
            previous_hop: None,
            next_hop: None,
        };
        Ok((header, body))
    }
}
