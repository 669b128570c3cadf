use bytes::{BufMut, Bytes, BytesMut};

use crate::content::Content;
use crate::error::CodecError;
use crate::field::{DecodeContext, WireDecode, WireEncode};
use crate::header::Header;
use crate::security::SecurityBlock;

/// `Header || Content || SecurityBlock`, framed by the header length field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub content: Content,
    pub security_block: SecurityBlock,
}

impl Message {
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut out = BytesMut::new();
        let length = self.header.encode_open(&mut out)?;
        self.content.encode(&mut out)?;
        self.security_block.encode(&mut out)?;
        length.patch(&mut out)?;
        Ok(out.freeze())
    }

    /// Decodes one message; bytes after its security block are ignored.
    pub fn decode(mut input: Bytes, ctx: &DecodeContext<'_>) -> Result<Self, CodecError> {
        let (header, mut body) = Header::decode_framed(&mut input, ctx)?;
        let content = Content::decode(&mut body, ctx)?;
        let security_block = SecurityBlock::decode(&mut body, ctx)?;
        Ok(Self {
            header,
            content,
            security_block,
        })
    }

    /// Bytes covered by a message signature.
    pub fn signed_payload(transaction_id: u64, content: &Content) -> Result<Bytes, CodecError> {
        let mut out = BytesMut::new();
        out.put_u64(transaction_id);
        content.encode(&mut out)?;
        Ok(out.freeze())
    }

    pub fn is_answer(&self) -> bool {
        self.content.is_answer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{JoinRequest, PingAnswer};
    use crate::header::{RELO_TOKEN, UNFRAGMENTED};
    use crate::storage::KindRegistry;
    use ringlet_core::{NodeId, ResourceId, RoutableId};

    fn node(byte: u8) -> NodeId {
        NodeId::new(vec![byte; 4]).unwrap()
    }

    fn sample() -> Message {
        let mut header = Header::new(
            0x0102_0304,
            42,
            node(1),
            vec![
                RoutableId::Node(node(2)),
                RoutableId::Resource(ResourceId::new(vec![3; 4]).unwrap()),
            ],
        );
        header.via_list.push(RoutableId::Node(node(9)));
        Message {
            header,
            content: Content::JoinRequest(JoinRequest {
                joining_node: node(1),
                overlay_data: Bytes::from_static(b"ring"),
            }),
            security_block: SecurityBlock::unsigned(),
        }
    }

    #[test]
    fn length_field_covers_the_rest_of_the_message() {
        let bytes = sample().encode().unwrap();
        assert_eq!(&bytes[..4], &RELO_TOKEN.to_be_bytes());
        assert_eq!(&bytes[12..16], &UNFRAGMENTED.to_be_bytes());
        let declared = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]) as usize;
        assert_eq!(declared, bytes.len() - 20);
    }

    #[test]
    fn decodes_what_it_encodes_without_local_hop_fields() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(4, &kinds);
        let mut message = sample();
        message.header.previous_hop = Some(node(7));
        let decoded = Message::decode(message.encode().unwrap(), &ctx).unwrap();
        assert_eq!(decoded.header.previous_hop, None);
        message.header.previous_hop = None;
        assert_eq!(decoded, message);
    }

    #[test]
    fn truncated_message_fails() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(4, &kinds);
        let bytes = sample().encode().unwrap();
        let cut = bytes.slice(..bytes.len() - 3);
        assert!(matches!(
            Message::decode(cut, &ctx),
            Err(CodecError::LengthOverflow { .. })
        ));
    }

    #[test]
    fn bad_token_is_rejected() {
        let kinds = KindRegistry::new();
        let ctx = DecodeContext::new(4, &kinds);
        let mut raw = sample().encode().unwrap().to_vec();
        raw[0] ^= 0xff;
        assert_eq!(
            Message::decode(Bytes::from(raw), &ctx).expect_err("token"),
            CodecError::Invalid("message token")
        );
    }

    #[test]
    fn signed_payload_starts_with_transaction_id() {
        let content = Content::PingAnswer(PingAnswer {
            response_id: 1,
            time: 2,
        });
        let payload = Message::signed_payload(7, &content).unwrap();
        assert_eq!(&payload[..8], &7_u64.to_be_bytes());
        assert_eq!(payload.len(), 8 + 2 + 4 + 16);
    }
}
